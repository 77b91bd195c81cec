//! Sense numbering: whether a sense gets a number and what its label is.
//!
//! Numbering is decided per level. A level with an empty numbering style is
//! never numbered. With several siblings every sense is numbered. A single
//! sense is numbered only when the options ask for it or when its own enabled
//! sub-sense level would itself be numbered, checked recursively.

use crate::view::{ConfigNode, SenseOptions};
use dictgen_types::RecordId;

/// Format of a sense number at one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingStyle {
    /// Empty style: the level is never numbered
    Unnumbered,
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
    /// Counts positions without emitting anything
    Hidden,
}

impl NumberingStyle {
    pub fn parse(style: &str) -> Self {
        match style.trim() {
            "" => NumberingStyle::Unnumbered,
            "%a" => NumberingStyle::LowerAlpha,
            "%A" => NumberingStyle::UpperAlpha,
            "%i" => NumberingStyle::LowerRoman,
            "%I" => NumberingStyle::UpperRoman,
            "%O" => NumberingStyle::Hidden,
            "%d" => NumberingStyle::Arabic,
            other => {
                tracing::debug!("Unknown numbering style '{}', using arabic", other);
                NumberingStyle::Arabic
            }
        }
    }

    /// Text for the 1-based `position`; empty for unnumbered and hidden styles
    pub fn format(&self, position: usize) -> String {
        match self {
            NumberingStyle::Unnumbered | NumberingStyle::Hidden => String::new(),
            NumberingStyle::Arabic => position.to_string(),
            NumberingStyle::LowerAlpha => alpha(position),
            NumberingStyle::UpperAlpha => alpha(position).to_uppercase(),
            NumberingStyle::LowerRoman => roman(position),
            NumberingStyle::UpperRoman => roman(position).to_uppercase(),
        }
    }
}

/// a, b, ..., z, aa, ab, ...
fn alpha(mut position: usize) -> String {
    let mut letters = Vec::new();
    while position > 0 {
        position -= 1;
        letters.push((b'a' + (position % 26) as u8) as char);
        position /= 26;
    }
    letters.iter().rev().collect()
}

fn roman(mut position: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while position >= value {
            out.push_str(numeral);
            position -= value;
        }
    }
    out
}

/// How a sub-sense label attaches to its parent's label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    None,
    Dotted,
    Joined,
}

impl JoinStyle {
    pub fn parse(style: &str) -> Self {
        match style.trim() {
            "%." => JoinStyle::Dotted,
            "%j" => JoinStyle::Joined,
            _ => JoinStyle::None,
        }
    }
}

/// Computed number of one sense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenseNumber {
    /// Full label including any parent prefix; children join to this
    pub label: String,
    /// Text to emit (empty for hidden styles)
    pub display: String,
}

/// Access to the sub-sense level below a sense, as the writer sees it
pub trait SenseLevels {
    /// The enabled sub-sense node under `node` and the visible sub-senses of `sense`
    fn sub_level<'n>(&'n self, sense: &RecordId, node: &'n ConfigNode) -> Option<(&'n ConfigNode, Vec<RecordId>)>;
}

/// Whether `sense` (one of `siblings`) is numbered under `node`
pub fn should_number<L: SenseLevels + ?Sized>(
    levels: &L,
    sense: &RecordId,
    node: &ConfigNode,
    siblings: &[RecordId],
) -> bool {
    let Some(options) = node.sense_options() else {
        return false;
    };
    if NumberingStyle::parse(&options.numbering_style) == NumberingStyle::Unnumbered {
        return false;
    }
    if siblings.len() > 1 || options.number_even_single {
        return true;
    }

    match levels.sub_level(sense, node) {
        Some((sub_node, sub_senses)) => sub_senses
            .iter()
            .any(|sub| should_number(levels, sub, sub_node, &sub_senses)),
        None => false,
    }
}

/// Label for the sense at 1-based `position` among its numbered siblings
pub fn label_for(position: usize, options: &SenseOptions, parent: Option<&SenseNumber>) -> SenseNumber {
    let style = NumberingStyle::parse(&options.numbering_style);
    let own = style.format(position);

    let prefix = match (JoinStyle::parse(&options.parent_join_style), parent) {
        (JoinStyle::None, _) | (_, None) => None,
        (join, Some(parent)) if !parent.label.is_empty() => Some((join, parent.label.as_str())),
        _ => None,
    };

    let label = match prefix {
        Some((_, parent)) if own.is_empty() => parent.to_string(),
        Some((JoinStyle::Dotted, parent)) => format!("{}.{}", parent, own),
        Some((_, parent)) => format!("{}{}", parent, own),
        None => own,
    };

    let display = if style == NumberingStyle::Hidden {
        String::new()
    } else {
        label.clone()
    };
    SenseNumber { label, display }
}

/// Numbers for a whole sibling list; `None` for senses that are not numbered
pub fn number_siblings<L: SenseLevels + ?Sized>(
    levels: &L,
    senses: &[RecordId],
    node: &ConfigNode,
    parent: Option<&SenseNumber>,
) -> Vec<Option<SenseNumber>> {
    let Some(options) = node.sense_options() else {
        return vec![None; senses.len()];
    };
    let mut position = 0;
    senses
        .iter()
        .map(|sense| {
            if should_number(levels, sense, node, senses) {
                position += 1;
                Some(label_for(position, options, parent))
            } else {
                None
            }
        })
        .collect()
}
