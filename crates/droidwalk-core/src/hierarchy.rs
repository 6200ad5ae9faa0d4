//! Parsing and searching of uiautomator window hierarchy dumps.
//!
//! `uiautomator dump` writes an XML document of nested `<node>` elements
//! under a single `<hierarchy>` root. This module turns that document into a
//! [`UIElement`] tree and provides the local search helpers the driver layer
//! uses to resolve [`Selector`]s.
//!
//! # Example
//!
//! ```
//! use droidwalk_core::hierarchy::{find_element, parse_hierarchy};
//! use droidwalk_core::selector::Selector;
//!
//! let xml = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
//! <hierarchy rotation="0">
//!   <node class="android.widget.FrameLayout" text="" bounds="[0,0][1080,2400]">
//!     <node class="android.widget.TextView" text="Welcome to NCL" bounds="[90,400][990,480]" />
//!   </node>
//! </hierarchy>"#;
//!
//! let tree = parse_hierarchy(xml).unwrap();
//! let welcome = find_element(&tree, &Selector::text_view("Welcome to NCL")).unwrap();
//! assert_eq!(welcome.bounds.unwrap().center(), (540, 440));
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

use crate::element::{ElementFrame, UIElement};
use crate::selector::Selector;

/// Errors that can occur while parsing a hierarchy dump.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// The dump is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// A `bounds` attribute did not have the `[l,t][r,b]` shape.
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
}

/// Parses a uiautomator XML dump into its top-level elements.
///
/// The `<hierarchy>` wrapper is dropped; the returned vector holds the
/// window root nodes (usually exactly one).
pub fn parse_hierarchy(xml: &str) -> Result<Vec<UIElement>, HierarchyError> {
    let mut reader = Reader::from_str(xml);
    let mut roots = Vec::new();
    let mut stack: Vec<UIElement> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| HierarchyError::Xml(e.to_string()))?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == b"node" => {
                stack.push(element_from_node(e)?);
            }
            Event::Empty(ref e) if e.name().as_ref() == b"node" => {
                let element = element_from_node(e)?;
                attach(&mut stack, &mut roots, element);
            }
            Event::End(ref e) if e.name().as_ref() == b"node" => {
                let element = stack
                    .pop()
                    .ok_or_else(|| HierarchyError::Xml("unbalanced </node>".to_string()))?;
                attach(&mut stack, &mut roots, element);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(HierarchyError::Xml("unexpected end of document".to_string()));
    }
    Ok(roots)
}

fn attach(stack: &mut [UIElement], roots: &mut Vec<UIElement>, element: UIElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

fn element_from_node(node: &BytesStart<'_>) -> Result<UIElement, HierarchyError> {
    let mut element = UIElement::default();

    for attr in node.attributes() {
        let attr = attr.map_err(|e| HierarchyError::Xml(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| HierarchyError::Xml(e.to_string()))?;
        match attr.key.as_ref() {
            b"class" => element.class_name = non_empty(&value),
            b"text" => element.text = non_empty(&value),
            b"resource-id" => element.resource_id = non_empty(&value),
            b"content-desc" => element.content_desc = non_empty(&value),
            b"package" => element.package = non_empty(&value),
            b"bounds" => element.bounds = Some(parse_bounds(&value)?),
            b"clickable" => element.clickable = value == "true",
            b"long-clickable" => element.long_clickable = value == "true",
            b"scrollable" => element.scrollable = value == "true",
            b"enabled" => element.enabled = value == "true",
            _ => {}
        }
    }

    Ok(element)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parses a uiautomator bounds string such as `[0,63][1080,210]`.
pub fn parse_bounds(raw: &str) -> Result<ElementFrame, HierarchyError> {
    let invalid = || HierarchyError::InvalidBounds(raw.to_string());

    let inner = raw
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(invalid)?;
    let (first, second) = inner.split_once("][").ok_or_else(invalid)?;

    let point = |s: &str| -> Result<(i32, i32), HierarchyError> {
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok((x, y))
    };

    let (left, top) = point(first)?;
    let (right, bottom) = point(second)?;
    Ok(ElementFrame { left, top, right, bottom })
}

/// Depth-first, pre-order search for the first element matching `selector`.
pub fn find_element(elements: &[UIElement], selector: &Selector) -> Option<UIElement> {
    for element in elements {
        if selector.matches(element) {
            return Some(element.clone());
        }
        if let Some(found) = find_element(&element.children, selector) {
            return Some(found);
        }
    }
    None
}

/// Flattens a hierarchy into the elements a user can identify.
///
/// Elements with no text, resource id, or content description are layout
/// containers and are skipped; their children are still visited.
pub fn flatten_elements(elements: &[UIElement]) -> Vec<UIElement> {
    let mut result = Vec::new();
    collect_elements(elements, &mut result);
    result
}

fn collect_elements(elements: &[UIElement], result: &mut Vec<UIElement>) {
    for element in elements {
        if element.text.is_some() || element.resource_id.is_some() || element.content_desc.is_some() {
            let mut flat = element.clone();
            flat.children = Vec::new();
            result.push(flat);
        }
        collect_elements(&element.children, result);
    }
}
