//! Semantic column resolution.
//!
//! Uploaded ledgers arrive with arbitrary headers ("Txn Date", "Narration",
//! "Dr Amount (INR)"). Each semantic field carries an ordered keyword list and a
//! column matches when its lower-cased header contains any keyword. The first
//! matching column in source order wins; `None` means "field absent", which
//! callers must not treat as an error by itself.

use crate::table::TabularSource;
use serde::{Deserialize, Serialize};

/// Header keywords that mark a column as holding numeric values. Every
/// amount keyword is also numeric.
pub const NUMERIC_KEYWORDS: &[&str] = &[
    "amount", "amt", "debit", "credit", "balance", "quantity", "qty", "price", "total",
];

/// Header keywords that mark a column as holding monetary amounts. This is
/// also the keyword set of [`SemanticField::Amount`].
pub const AMOUNT_KEYWORDS: &[&str] = &["amount", "amt", "debit", "credit", "total"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Date,
    Description,
    Amount,
    Debit,
    Credit,
    Reference,
    Account,
    Phone,
    Email,
}

impl SemanticField {
    pub const REQUIRED: [SemanticField; 3] = [
        SemanticField::Date,
        SemanticField::Description,
        SemanticField::Amount,
    ];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            SemanticField::Date => &["date"],
            SemanticField::Description => &[
                "description",
                "desc",
                "narration",
                "particular",
                "memo",
                "details",
            ],
            SemanticField::Amount => AMOUNT_KEYWORDS,
            SemanticField::Debit => &["debit"],
            SemanticField::Credit => &["credit"],
            SemanticField::Reference => &[
                "reference",
                "ref",
                "voucher",
                "invoice no",
                "invoice number",
                "invoice #",
                "bill no",
                "document no",
            ],
            SemanticField::Account => &["account", "acct", "ledger code", "gl code"],
            SemanticField::Phone => &["phone", "mobile"],
            SemanticField::Email => &["email", "e-mail"],
        }
    }

    /// Headers matching these keywords never resolve to this field, so
    /// "Invoice Date" or "Voucher Date" is not taken for a reference.
    pub fn excluded_keywords(&self) -> &'static [&'static str] {
        match self {
            SemanticField::Reference | SemanticField::Account => SemanticField::Date.keywords(),
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SemanticField::Date => "date",
            SemanticField::Description => "description",
            SemanticField::Amount => "amount",
            SemanticField::Debit => "debit",
            SemanticField::Credit => "credit",
            SemanticField::Reference => "reference",
            SemanticField::Account => "account",
            SemanticField::Phone => "phone",
            SemanticField::Email => "email",
        }
    }
}

fn header_matches(header: &str, keywords: &[&str]) -> bool {
    let header = header.to_lowercase();
    keywords
        .iter()
        .any(|keyword| header.contains(&keyword.to_lowercase()))
}

/// Position of the first column whose header contains any keyword.
pub fn resolve_index<S: TabularSource + ?Sized>(source: &S, keywords: &[&str]) -> Option<usize> {
    source
        .columns()
        .iter()
        .position(|header| header_matches(header, keywords))
}

/// Name of the first column whose header contains any keyword.
pub fn resolve<S: TabularSource + ?Sized>(source: &S, keywords: &[&str]) -> Option<String> {
    resolve_index(source, keywords).map(|idx| source.columns()[idx].clone())
}

/// Every matching column position, in source order.
pub fn resolve_all<S: TabularSource + ?Sized>(source: &S, keywords: &[&str]) -> Vec<usize> {
    source
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, header)| header_matches(header, keywords))
        .map(|(idx, _)| idx)
        .collect()
}

pub struct ColumnResolver;

impl ColumnResolver {
    pub fn resolve_field<S: TabularSource + ?Sized>(
        source: &S,
        field: SemanticField,
    ) -> Option<usize> {
        let excluded = field.excluded_keywords();
        source.columns().iter().position(|header| {
            header_matches(header, field.keywords()) && !header_matches(header, excluded)
        })
    }

    /// Required fields that no column maps to.
    pub fn missing_required<S: TabularSource + ?Sized>(source: &S) -> Vec<SemanticField> {
        SemanticField::REQUIRED
            .iter()
            .copied()
            .filter(|field| Self::resolve_field(source, *field).is_none())
            .collect()
    }
}
