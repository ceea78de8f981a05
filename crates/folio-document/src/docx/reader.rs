// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX reader — paragraph text from `word/document.xml`.

use std::io::{Cursor, Read};

use folio_core::error::{FolioError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read the text of every body paragraph, in document order.
///
/// Runs are concatenated; `w:tab` becomes a tab and `w:br`/`w:cr` a newline.
/// Page breaks and formatting are discarded.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn read_paragraphs(data: &[u8]) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|err| FolioError::SourceParse(format!("not a DOCX archive: {err}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|err| FolioError::SourceParse(format!("missing {DOCUMENT_PART}: {err}")))?
        .read_to_string(&mut xml)
        .map_err(|err| FolioError::SourceParse(format!("cannot read {DOCUMENT_PART}: {err}")))?;

    let paragraphs = parse_document_xml(&xml)?;
    debug!(paragraphs = paragraphs.len(), "DOCX paragraphs read");
    Ok(paragraphs)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => push_char(&mut current, '\t'),
                b"w:br" if is_page_break(e) => {}
                b"w:br" | b"w:cr" => push_char(&mut current, '\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| FolioError::SourceParse(format!("bad text in {DOCUMENT_PART}: {err}")))?;
                if let Some(paragraph) = current.as_mut() {
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(FolioError::SourceParse(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {err}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn is_page_break(element: &BytesStart) -> bool {
    matches!(
        element.try_get_attribute("w:type"),
        Ok(Some(attr)) if attr.value.as_ref() == b"page"
    )
}

fn push_char(current: &mut Option<String>, ch: char) {
    if let Some(paragraph) = current.as_mut() {
        paragraph.push(ch);
    }
}
