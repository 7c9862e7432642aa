//! Filter document parser.
//!
//! Reads the XML into a small element tree first, then lowers it into the
//! condition tree. Constructs outside the known set are reported as
//! [`UnsupportedFeature`]s and dropped; only documents that are not
//! well-formed fail.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ast::{BoolOp, Condition, Filter, FilterDocument, FilterItem, LinkEntity, LinkType};
use super::operator::Operator;
use super::{UnsupportedFeature, UnsupportedKind};

/// Errors for documents that cannot be read at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterParseError {
    #[error("XML error: {0}")]
    Xml(String),

    #[error("Unexpected root element <{0}>; expected <fetch>, <entity> or <filter>")]
    UnexpectedRoot(String),

    #[error("<fetch> has no <entity> element")]
    MissingEntity,
}

/// Parsed document plus the constructs dropped while lowering it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseOutput {
    pub document: FilterDocument,
    pub unsupported: Vec<UnsupportedFeature>,
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Parse a filter document.
pub fn parse(xml: &str) -> Result<ParseOutput, FilterParseError> {
    let root = read_tree(xml)?;
    let mut lowering = Lowering::default();

    let document = match root.name.to_ascii_lowercase().as_str() {
        "fetch" => {
            let entity = root
                .children_named("entity")
                .next()
                .ok_or(FilterParseError::MissingEntity)?;
            lowering.entity(entity)
        }
        "entity" => lowering.entity(&root),
        "filter" => FilterDocument {
            entity: None,
            filters: lowering.filter(&root).into_iter().collect(),
            links: Vec::new(),
        },
        other => return Err(FilterParseError::UnexpectedRoot(other.to_string())),
    };

    Ok(ParseOutput {
        document,
        unsupported: lowering.unsupported,
    })
}

fn read_tree(xml: &str) -> Result<Element, FilterParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(element_from(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let el = element_from(&e)?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(to_xml_err)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| FilterParseError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(to_xml_err(e)),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(FilterParseError::Xml(
            "unexpected end of document".to_string(),
        ));
    }
    root.ok_or_else(|| FilterParseError::Xml("document has no root element".to_string()))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
) -> Result<(), FilterParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => {
            return Err(FilterParseError::Xml(
                "more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

fn element_from(e: &BytesStart<'_>) -> Result<Element, FilterParseError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| FilterParseError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(to_xml_err)?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        ..Element::default()
    })
}

fn to_xml_err(err: quick_xml::Error) -> FilterParseError {
    FilterParseError::Xml(err.to_string())
}

#[derive(Default)]
struct Lowering {
    unsupported: Vec<UnsupportedFeature>,
}

impl Lowering {
    fn flag(&mut self, kind: UnsupportedKind, detail: String) {
        self.unsupported.push(UnsupportedFeature::new(kind, detail));
    }

    fn entity(&mut self, el: &Element) -> FilterDocument {
        let mut doc = FilterDocument {
            entity: el.attr("name").map(str::to_string),
            ..FilterDocument::default()
        };
        for child in &el.children {
            match child.name.to_ascii_lowercase().as_str() {
                "filter" => doc.filters.extend(self.filter(child)),
                "link-entity" => doc.links.extend(self.link(child)),
                _ => {}
            }
        }
        doc
    }

    fn filter(&mut self, el: &Element) -> Option<Filter> {
        let op = match el.attr("type").map(|t| t.trim().to_ascii_lowercase()) {
            None => BoolOp::And,
            Some(t) if t == "and" || t.is_empty() => BoolOp::And,
            Some(t) if t == "or" => BoolOp::Or,
            Some(t) => {
                self.flag(
                    UnsupportedKind::FilterType,
                    format!("filter type '{t}' is not supported; group dropped"),
                );
                return None;
            }
        };

        let mut filter = Filter::new(op);
        for child in &el.children {
            match child.name.to_ascii_lowercase().as_str() {
                "condition" => {
                    if let Some(c) = self.condition(child) {
                        filter.items.push(FilterItem::Condition(c));
                    }
                }
                "filter" => {
                    if let Some(f) = self.filter(child) {
                        filter.items.push(FilterItem::Filter(f));
                    }
                }
                "link-entity" => {
                    if let Some(l) = self.link(child) {
                        filter.items.push(FilterItem::Link(l));
                    }
                }
                _ => {}
            }
        }
        Some(filter)
    }

    fn condition(&mut self, el: &Element) -> Option<Condition> {
        let Some(attribute) = el.attr("attribute").filter(|a| !a.trim().is_empty()) else {
            self.flag(
                UnsupportedKind::Malformed,
                "condition without an attribute was dropped".to_string(),
            );
            return None;
        };

        let op_name = el.attr("operator").unwrap_or_default();
        let Some(operator) = Operator::parse(op_name) else {
            self.flag(
                UnsupportedKind::UnknownOperator,
                format!("operator '{op_name}' on attribute '{attribute}' is not supported"),
            );
            return None;
        };

        if el.attr("valueof").is_some() {
            self.flag(
                UnsupportedKind::ColumnComparison,
                format!("column comparison (valueof) on attribute '{attribute}' is not supported"),
            );
            return None;
        }

        let values = match el.attr("value") {
            Some(v) => vec![v.to_string()],
            None => el
                .children_named("value")
                .map(|v| v.text.trim().to_string())
                .collect(),
        };

        Some(Condition {
            attribute: attribute.to_string(),
            entity_name: el.attr("entityname").map(str::to_string),
            operator,
            values,
        })
    }

    fn link(&mut self, el: &Element) -> Option<LinkEntity> {
        let Some(name) = el.attr("name").filter(|n| !n.trim().is_empty()) else {
            self.flag(
                UnsupportedKind::Malformed,
                "link-entity without a name was dropped".to_string(),
            );
            return None;
        };

        let mut link = LinkEntity {
            name: name.to_string(),
            from: el.attr("from").map(str::to_string),
            to: el.attr("to").map(str::to_string),
            alias: el.attr("alias").map(str::to_string),
            link_type: LinkType::parse(el.attr("link-type")),
            filters: Vec::new(),
            links: Vec::new(),
        };
        for child in &el.children {
            match child.name.to_ascii_lowercase().as_str() {
                "filter" => link.filters.extend(self.filter(child)),
                "link-entity" => link.links.extend(self.link(child)),
                _ => {}
            }
        }
        Some(link)
    }
}
