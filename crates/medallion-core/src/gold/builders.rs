//! Build functions for each mart
//!
//! Builders are pure: they read Silver tables and previously built marts from
//! [`BuildInputs`] and return a new table. Persisting, plan gating and error
//! isolation are the Gold stage's job.

use super::catalog::MartKind;
use super::schemas::{self, CUSTOMER_COLUMNS, PRODUCT_COLUMNS, SALES_COLUMNS};
use crate::errors::{PipelineError, Result};
use crate::normalize::{self, format_decimal, join_key, parse_decimal, parse_int};
use crate::silver::SourceTable;
use crate::table::{Cell, Table};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const UNKNOWN: &str = "Unknown";
const MEASURE_PLACES: usize = 2;

pub const DIM_CUSTOMER_COLUMNS: [&str; 11] = [
    "cst_id",
    "cst_key",
    "cst_firstname",
    "cst_lastname",
    "cst_marital_status",
    "cst_gndr",
    "cst_create_date",
    "CID",
    "BDATE",
    "GEN",
    "CNTRY",
];

pub const DIM_PRODUCT_COLUMNS: [&str; 11] = [
    "prd_id",
    "prd_key",
    "prd_nm",
    "prd_cost",
    "prd_line",
    "prd_start_dt",
    "prd_end_dt",
    "ID",
    "CAT",
    "SUBCAT",
    "MAINTENANCE",
];

pub const DIM_LOCATION_COLUMNS: [&str; 2] = ["CID", "CNTRY"];

pub const AGG_EXEC_KPIS_COLUMNS: [&str; 7] = [
    "period",
    "customer_segment",
    "total_sales",
    "order_count",
    "customer_count",
    "avg_order_value",
    "customer_lifetime_value",
];

pub const AGG_PRODUCT_COLUMNS: [&str; 8] = [
    "prd_id",
    "period",
    "prd_line",
    "CAT",
    "SUBCAT",
    "total_sales",
    "total_quantity",
    "order_count",
];

pub const AGG_GEO_COLUMNS: [&str; 7] = [
    "CNTRY",
    "CAT",
    "period",
    "total_sales",
    "total_quantity",
    "order_count",
    "customer_count",
];

const WIDE_EXTRA_COLUMNS: [&str; 13] = [
    "period",
    "revenue",
    "cst_key",
    "cst_firstname",
    "cst_lastname",
    "cst_marital_status",
    "cst_gndr",
    "BDATE",
    "prd_nm",
    "prd_line",
    "CAT",
    "SUBCAT",
    "CNTRY",
];

/// Output columns of a mart, in file order
pub fn output_columns(mart: MartKind) -> Vec<String> {
    let names: Vec<&str> = match mart {
        MartKind::DimCustomer => DIM_CUSTOMER_COLUMNS.to_vec(),
        MartKind::DimProduct => DIM_PRODUCT_COLUMNS.to_vec(),
        MartKind::DimLocation => DIM_LOCATION_COLUMNS.to_vec(),
        MartKind::FactSales => SALES_COLUMNS.to_vec(),
        MartKind::AggExecKpis => AGG_EXEC_KPIS_COLUMNS.to_vec(),
        MartKind::AggProductPerformance => AGG_PRODUCT_COLUMNS.to_vec(),
        MartKind::AggGeoPerformance => AGG_GEO_COLUMNS.to_vec(),
        MartKind::WideSalesEnriched => SALES_COLUMNS
            .iter()
            .chain(WIDE_EXTRA_COLUMNS.iter())
            .copied()
            .collect(),
    };
    names.into_iter().map(str::to_string).collect()
}

/// Silver tables and already-built marts visible to a builder
#[derive(Debug, Default)]
pub struct BuildInputs {
    sources: BTreeMap<SourceTable, Table>,
    marts: BTreeMap<MartKind, Table>,
}

impl BuildInputs {
    pub fn new(sources: BTreeMap<SourceTable, Table>) -> Self {
        Self {
            sources,
            marts: BTreeMap::new(),
        }
    }

    pub fn has_source(&self, table: &SourceTable) -> bool {
        self.sources.contains_key(table)
    }

    pub fn has_mart(&self, mart: MartKind) -> bool {
        self.marts.contains_key(&mart)
    }

    pub fn mart(&self, mart: MartKind) -> Option<&Table> {
        self.marts.get(&mart)
    }

    /// Make a built mart visible to later builders
    pub fn insert_mart(&mut self, mart: MartKind, table: Table) {
        self.marts.insert(mart, table);
    }

    /// Source table checked against its required schema, if present.
    fn checked_source(&self, table: &SourceTable) -> Result<Option<&Table>> {
        match self.sources.get(table) {
            Some(t) => {
                t.require_columns(table.name(), schemas::required_columns(table))?;
                Ok(Some(t))
            }
            None => Ok(None),
        }
    }

    fn require_source(&self, mart: MartKind, table: &SourceTable) -> Result<&Table> {
        self.checked_source(table)?
            .ok_or_else(|| PipelineError::MissingDependency {
                mart: mart.name().to_string(),
                dependency: table.name().to_string(),
            })
    }

    fn require_mart(&self, mart: MartKind, upstream: MartKind) -> Result<&Table> {
        self.marts
            .get(&upstream)
            .ok_or_else(|| PipelineError::MissingDependency {
                mart: mart.name().to_string(),
                dependency: upstream.name().to_string(),
            })
    }
}

/// Build one mart from its inputs.
///
/// # Errors
///
/// Returns `MissingDependency` when a required input is absent and
/// `SchemaMismatch` when an input lacks required columns.
pub fn build_mart(mart: MartKind, inputs: &BuildInputs) -> Result<Table> {
    match mart {
        MartKind::DimCustomer => build_dim_customer(inputs),
        MartKind::DimProduct => build_dim_product(inputs),
        MartKind::DimLocation => build_dim_location(inputs),
        MartKind::FactSales => build_fact_sales(inputs),
        MartKind::AggExecKpis => build_agg_exec_kpis(inputs),
        MartKind::AggProductPerformance => build_agg_product_performance(inputs),
        MartKind::AggGeoPerformance => build_agg_geo_performance(inputs),
        MartKind::WideSalesEnriched => build_wide_sales_enriched(inputs),
    }
}

/// First row per key; rows whose key is null are not indexed.
fn index_by<'t, F>(table: &'t Table, column: &str, key: F) -> HashMap<String, &'t [Cell]>
where
    F: Fn(Option<&str>) -> Option<String>,
{
    let mut index = HashMap::new();
    if let Some(idx) = table.column_index(column) {
        for row in table.rows() {
            if let Some(k) = key(row[idx].as_deref()) {
                index.entry(k).or_insert(row.as_slice());
            }
        }
    }
    index
}

fn exact_key(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn int_key(value: Option<&str>) -> Option<String> {
    value.and_then(parse_int).map(|i| i.to_string())
}

fn cell_of(row: Option<&[Cell]>, table: &Table, column: &str) -> Cell {
    let idx = table.column_index(column)?;
    row?.get(idx)?.clone()
}

fn label(cell: Cell) -> String {
    cell.unwrap_or_else(|| UNKNOWN.to_string())
}

/// Line revenue: the recorded sales amount, else quantity times price.
pub fn line_revenue(sales: Option<&str>, quantity: Option<&str>, price: Option<&str>) -> f64 {
    sales
        .and_then(parse_decimal)
        .or_else(|| Some(quantity.and_then(parse_decimal)? * price.and_then(parse_decimal)?))
        .unwrap_or(0.0)
}

fn build_dim_customer(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::DimCustomer;
    let customers = inputs.require_source(mart, &SourceTable::CstInfo)?;
    let demographics = inputs.checked_source(&SourceTable::CstAz12)?;
    let locations = inputs.checked_source(&SourceTable::LocA101)?;

    let cols = customers.indices(SourceTable::CstInfo.name(), &CUSTOMER_COLUMNS)?;
    let key_idx = cols[1];
    let az_index = demographics.map(|t| index_by(t, "CID", join_key));
    let loc_index = locations.map(|t| index_by(t, "CID", join_key));

    let mut out = Table::new(output_columns(mart));
    let mut seen: HashSet<Cell> = HashSet::new();
    for row in customers.rows() {
        if !seen.insert(row[cols[0]].clone()) {
            continue;
        }
        let key = join_key(row[key_idx].as_deref());
        let mut values: Vec<Cell> = cols.iter().map(|i| row[*i].clone()).collect();

        let az_row = match (&az_index, &key) {
            (Some(index), Some(k)) => index.get(k).copied(),
            _ => None,
        };
        if let Some(az) = demographics {
            values.push(cell_of(az_row, az, "CID"));
            values.push(cell_of(az_row, az, "BDATE"));
            values.push(cell_of(az_row, az, "GEN"));
        } else {
            values.extend([None, None, None]);
        }

        let loc_row = match (&loc_index, &key) {
            (Some(index), Some(k)) => index.get(k).copied(),
            _ => None,
        };
        values.push(locations.and_then(|loc| cell_of(loc_row, loc, "CNTRY")));
        out.push_row(values);
    }
    Ok(out)
}

fn build_dim_product(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::DimProduct;
    let products = inputs.require_source(mart, &SourceTable::PrdInfo)?;
    let categories = inputs.checked_source(&SourceTable::PxCatG1v2)?;

    let cols = products.indices(SourceTable::PrdInfo.name(), &PRODUCT_COLUMNS)?;
    let cat_index = categories.map(|t| index_by(t, "ID", exact_key));

    let mut out = Table::new(output_columns(mart));
    let mut seen: HashSet<Cell> = HashSet::new();
    for row in products.rows() {
        let prd_key = row[cols[0]].clone();
        if !seen.insert(prd_key.clone()) {
            continue;
        }
        let mut values: Vec<Cell> = vec![prd_key.clone()];
        values.extend(cols.iter().map(|i| row[*i].clone()));

        let cat_row = match (&cat_index, exact_key(prd_key.as_deref())) {
            (Some(index), Some(k)) => index.get(&k).copied(),
            _ => None,
        };
        for column in ["ID", "CAT", "SUBCAT", "MAINTENANCE"] {
            values.push(categories.and_then(|cat| cell_of(cat_row, cat, column)));
        }
        out.push_row(values);
    }
    Ok(out)
}

fn build_dim_location(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::DimLocation;
    let locations = inputs.require_source(mart, &SourceTable::LocA101)?;
    let cols = locations.indices(SourceTable::LocA101.name(), &DIM_LOCATION_COLUMNS)?;

    let mut out = Table::new(output_columns(mart));
    let mut seen: HashSet<Cell> = HashSet::new();
    for row in locations.rows() {
        if seen.insert(row[cols[0]].clone()) {
            out.push_row(cols.iter().map(|i| row[*i].clone()).collect());
        }
    }
    Ok(out)
}

fn build_fact_sales(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::FactSales;
    let sales = inputs.require_source(mart, &SourceTable::SalesDetails)?;
    let cols = sales.indices(SourceTable::SalesDetails.name(), &SALES_COLUMNS)?;

    let mut out = Table::new(output_columns(mart));
    let mut seen: HashSet<(Cell, Cell)> = HashSet::new();
    for row in sales.rows() {
        let key = (row[cols[0]].clone(), row[cols[1]].clone());
        if seen.insert(key) {
            out.push_row(cols.iter().map(|i| row[*i].clone()).collect());
        }
    }
    Ok(out)
}

/// Positions of the fact columns used by every downstream mart
struct FactColumns {
    ord_num: usize,
    prd_key: usize,
    cust_id: usize,
    sales: usize,
    quantity: usize,
    price: usize,
    order_dt: usize,
}

impl FactColumns {
    fn resolve(fact: &Table) -> Result<Self> {
        let c = fact.indices(MartKind::FactSales.name(), &SALES_COLUMNS)?;
        Ok(Self {
            ord_num: c[0],
            prd_key: c[1],
            cust_id: c[2],
            sales: c[3],
            quantity: c[4],
            price: c[5],
            order_dt: c[6],
        })
    }

    fn revenue(&self, row: &[Cell]) -> f64 {
        line_revenue(
            row[self.sales].as_deref(),
            row[self.quantity].as_deref(),
            row[self.price].as_deref(),
        )
    }

    fn quantity(&self, row: &[Cell]) -> f64 {
        row[self.quantity]
            .as_deref()
            .and_then(parse_decimal)
            .unwrap_or(0.0)
    }

    fn period(&self, row: &[Cell]) -> String {
        normalize::period_of(row[self.order_dt].as_deref()).unwrap_or_else(|| UNKNOWN.to_string())
    }
}

#[derive(Default)]
struct Measures {
    sales: f64,
    quantity: f64,
    orders: BTreeSet<String>,
    customers: BTreeSet<String>,
}

impl Measures {
    fn add(&mut self, cols: &FactColumns, row: &[Cell]) {
        self.sales += cols.revenue(row);
        self.quantity += cols.quantity(row);
        if let Some(order) = &row[cols.ord_num] {
            self.orders.insert(order.clone());
        }
        if let Some(customer) = &row[cols.cust_id] {
            self.customers.insert(customer.clone());
        }
    }

    fn ratio(&self, denominator: usize) -> f64 {
        if denominator == 0 {
            0.0
        } else {
            self.sales / denominator as f64
        }
    }
}

fn measure(value: f64) -> Cell {
    Some(format_decimal(value, MEASURE_PLACES))
}

fn count(value: usize) -> Cell {
    Some(value.to_string())
}

fn build_agg_exec_kpis(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::AggExecKpis;
    let fact = inputs.require_mart(mart, MartKind::FactSales)?;
    let customers = inputs.require_mart(mart, MartKind::DimCustomer)?;
    let cols = FactColumns::resolve(fact)?;
    let customer_index = index_by(customers, "cst_id", int_key);

    let mut groups: BTreeMap<(String, String), Measures> = BTreeMap::new();
    for row in fact.rows() {
        let customer = int_key(row[cols.cust_id].as_deref())
            .and_then(|k| customer_index.get(&k).copied());
        let segment = label(cell_of(customer, customers, "cst_marital_status"));
        groups
            .entry((cols.period(row), segment))
            .or_default()
            .add(&cols, row);
    }

    let mut out = Table::new(output_columns(mart));
    for ((period, segment), m) in groups {
        out.push_row(vec![
            Some(period),
            Some(segment),
            measure(m.sales),
            count(m.orders.len()),
            count(m.customers.len()),
            measure(m.ratio(m.orders.len())),
            measure(m.ratio(m.customers.len())),
        ]);
    }
    Ok(out)
}

fn build_agg_product_performance(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::AggProductPerformance;
    let fact = inputs.require_mart(mart, MartKind::FactSales)?;
    let products = inputs.require_mart(mart, MartKind::DimProduct)?;
    let cols = FactColumns::resolve(fact)?;
    let product_index = index_by(products, "prd_key", exact_key);

    let mut groups: BTreeMap<[String; 5], Measures> = BTreeMap::new();
    for row in fact.rows() {
        let product = exact_key(row[cols.prd_key].as_deref())
            .and_then(|k| product_index.get(&k).copied());
        let prd_id = cell_of(product, products, "prd_id")
            .or_else(|| row[cols.prd_key].clone());
        let key = [
            label(prd_id),
            cols.period(row),
            label(cell_of(product, products, "prd_line")),
            label(cell_of(product, products, "CAT")),
            label(cell_of(product, products, "SUBCAT")),
        ];
        groups.entry(key).or_default().add(&cols, row);
    }

    let mut out = Table::new(output_columns(mart));
    for (key, m) in groups {
        let mut values: Vec<Cell> = key.into_iter().map(Some).collect();
        values.push(measure(m.sales));
        values.push(measure(m.quantity));
        values.push(count(m.orders.len()));
        out.push_row(values);
    }
    Ok(out)
}

fn build_agg_geo_performance(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::AggGeoPerformance;
    let fact = inputs.require_mart(mart, MartKind::FactSales)?;
    let locations = inputs.require_mart(mart, MartKind::DimLocation)?;
    let products = inputs.require_mart(mart, MartKind::DimProduct)?;
    let customers = inputs.mart(MartKind::DimCustomer);
    let cols = FactColumns::resolve(fact)?;

    let location_index = index_by(locations, "CID", join_key);
    let product_index = index_by(products, "prd_key", exact_key);
    let customer_index = customers.map(|c| index_by(c, "cst_id", int_key));

    let mut groups: BTreeMap<[String; 3], Measures> = BTreeMap::new();
    for row in fact.rows() {
        let cust_id = row[cols.cust_id].as_deref();
        let customer_key = match (customers, &customer_index) {
            (Some(table), Some(index)) => {
                let customer = int_key(cust_id).and_then(|k| index.get(&k).copied());
                join_key(cell_of(customer, table, "cst_key").as_deref())
            }
            _ => None,
        };
        let location = customer_key
            .and_then(|k| location_index.get(&k).copied())
            .or_else(|| join_key(cust_id).and_then(|k| location_index.get(&k).copied()));
        let product = exact_key(row[cols.prd_key].as_deref())
            .and_then(|k| product_index.get(&k).copied());

        let key = [
            label(cell_of(location, locations, "CNTRY")),
            label(cell_of(product, products, "CAT")),
            cols.period(row),
        ];
        groups.entry(key).or_default().add(&cols, row);
    }

    let mut out = Table::new(output_columns(mart));
    for (key, m) in groups {
        let mut values: Vec<Cell> = key.into_iter().map(Some).collect();
        values.push(measure(m.sales));
        values.push(measure(m.quantity));
        values.push(count(m.orders.len()));
        values.push(count(m.customers.len()));
        out.push_row(values);
    }
    Ok(out)
}

fn build_wide_sales_enriched(inputs: &BuildInputs) -> Result<Table> {
    let mart = MartKind::WideSalesEnriched;
    let fact = inputs.require_mart(mart, MartKind::FactSales)?;
    let customers = inputs.require_mart(mart, MartKind::DimCustomer)?;
    let products = inputs.require_mart(mart, MartKind::DimProduct)?;
    let locations = inputs.require_mart(mart, MartKind::DimLocation)?;
    let cols = FactColumns::resolve(fact)?;
    let fact_idx = fact.indices(MartKind::FactSales.name(), &SALES_COLUMNS)?;

    let customer_index = index_by(customers, "cst_id", int_key);
    let product_index = index_by(products, "prd_key", exact_key);
    let location_index = index_by(locations, "CID", join_key);

    let mut out = Table::new(output_columns(mart));
    for row in fact.rows() {
        let customer = int_key(row[cols.cust_id].as_deref())
            .and_then(|k| customer_index.get(&k).copied());
        let product = exact_key(row[cols.prd_key].as_deref())
            .and_then(|k| product_index.get(&k).copied());
        let location = join_key(cell_of(customer, customers, "cst_key").as_deref())
            .and_then(|k| location_index.get(&k).copied());

        let mut values: Vec<Cell> = fact_idx.iter().map(|i| row[*i].clone()).collect();
        values.push(normalize::period_of(row[cols.order_dt].as_deref()));
        values.push(measure(cols.revenue(row)));
        for column in [
            "cst_key",
            "cst_firstname",
            "cst_lastname",
            "cst_marital_status",
            "cst_gndr",
            "BDATE",
        ] {
            values.push(cell_of(customer, customers, column));
        }
        for column in ["prd_nm", "prd_line", "CAT", "SUBCAT"] {
            values.push(cell_of(product, products, column));
        }
        values.push(cell_of(location, locations, "CNTRY"));
        out.push_row(values);
    }
    Ok(out)
}
