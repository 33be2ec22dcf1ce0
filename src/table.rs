//! The fixed set of TPC-H tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A TPC-H base table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Customer,
    Part,
    Partsupp,
    Region,
    Supplier,
    Nation,
    Orders,
    Lineitem,
}

impl TableName {
    /// Tables in the order the generator output is converted.
    pub const ALL: [TableName; 8] = [
        TableName::Customer,
        TableName::Part,
        TableName::Partsupp,
        TableName::Region,
        TableName::Supplier,
        TableName::Nation,
        TableName::Orders,
        TableName::Lineitem,
    ];

    /// Tables that receive incremental rows in a refresh set, in RF1 order.
    pub const REFRESHED: [TableName; 2] = [TableName::Orders, TableName::Lineitem];

    /// Lower-case name used for file naming.
    pub fn file_stem(self) -> &'static str {
        match self {
            TableName::Customer => "customer",
            TableName::Part => "part",
            TableName::Partsupp => "partsupp",
            TableName::Region => "region",
            TableName::Supplier => "supplier",
            TableName::Nation => "nation",
            TableName::Orders => "orders",
            TableName::Lineitem => "lineitem",
        }
    }

    /// Upper-case name used in generated statements.
    pub fn sql_name(self) -> String {
        self.file_stem().to_ascii_uppercase()
    }

    /// `<table>.tbl`
    pub fn data_file(self) -> String {
        format!("{}.tbl", self.file_stem())
    }

    /// `<table>.tbl.u<set>`
    pub fn update_file(self, set: u32) -> String {
        format!("{}.tbl.u{}", self.file_stem(), set)
    }

    /// `<table>.sql`
    pub fn load_file(self) -> String {
        format!("{}.sql", self.file_stem())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}
