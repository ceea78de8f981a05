// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small helpers for walking lopdf object graphs.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Maximum depth followed when walking /Parent chains.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Follow a reference to the object it names; other objects are returned
/// unchanged. Dangling references resolve to `None`.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve `object` and view it as a dictionary, if it is one.
pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Numeric value of an Integer or Real object.
pub fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

/// Numeric operand helper for content stream operators.
pub fn number_at(operands: &[Object], index: usize) -> Option<f64> {
    operands.get(index).and_then(as_number)
}

/// Name value of a Name object (possibly behind a reference).
pub fn name_of<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a [u8]> {
    match resolve(doc, object)? {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Look up a page attribute that may be inherited from ancestor /Pages nodes
/// (MediaBox, CropBox, Resources, Rotate).
pub fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn inherited_attributes_come_from_parent() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1i64,
                "Rotate" => 90i64,
            }),
        );

        let rotate = resolve_inherited(&doc, page_id, b"Rotate").and_then(as_number);
        assert_eq!(rotate, Some(90.0));
        assert!(resolve_inherited(&doc, page_id, b"MediaBox").is_none());
    }

    #[test]
    fn numbers_accept_integers_and_reals() {
        assert_eq!(as_number(&Object::Integer(3)), Some(3.0));
        assert_eq!(as_number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(as_number(&Object::Null), None);
    }
}
