//! Columns each Silver table must carry before a mart may read it

use crate::silver::SourceTable;

pub const SALES_COLUMNS: [&str; 9] = [
    "sls_ord_num",
    "sls_prd_key",
    "sls_cust_id",
    "sls_sales",
    "sls_quantity",
    "sls_price",
    "sls_order_dt",
    "sls_ship_dt",
    "sls_due_dt",
];

pub const PRODUCT_COLUMNS: [&str; 6] = [
    "prd_key",
    "prd_nm",
    "prd_cost",
    "prd_line",
    "prd_start_dt",
    "prd_end_dt",
];

pub const CATEGORY_COLUMNS: [&str; 4] = ["ID", "CAT", "SUBCAT", "MAINTENANCE"];

pub const CUSTOMER_COLUMNS: [&str; 7] = [
    "cst_id",
    "cst_key",
    "cst_firstname",
    "cst_lastname",
    "cst_marital_status",
    "cst_gndr",
    "cst_create_date",
];

pub const DEMOGRAPHIC_COLUMNS: [&str; 3] = ["CID", "BDATE", "GEN"];

pub const LOCATION_COLUMNS: [&str; 2] = ["CID", "CNTRY"];

pub fn required_columns(table: &SourceTable) -> &'static [&'static str] {
    match table {
        SourceTable::SalesDetails => &SALES_COLUMNS,
        SourceTable::PrdInfo => &PRODUCT_COLUMNS,
        SourceTable::PxCatG1v2 => &CATEGORY_COLUMNS,
        SourceTable::CstInfo => &CUSTOMER_COLUMNS,
        SourceTable::CstAz12 => &DEMOGRAPHIC_COLUMNS,
        SourceTable::LocA101 => &LOCATION_COLUMNS,
        SourceTable::Other(_) => &[],
    }
}
