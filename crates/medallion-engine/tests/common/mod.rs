//! Shared raw-source fixtures for engine integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use medallion_engine::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CST_INFO: &str = "\
cst_id,cst_key,cst_firstname,cst_lastname,cst_marital_status,cst_gndr,cst_create_date
11000,AW00011000,  Alice  ,Smith,M,F,2025-10-06
11001,AW00011001,Bob,  Jones,S,M,2025-10-07
";

pub const PRD_INFO: &str = "\
prd_id,prd_key,prd_nm,prd_cost,prd_line,prd_start_dt,prd_end_dt
210,CO-RF-FR-R92B-58,HL Road Frame,100,R,2003-07-01,
211,BK-R93R-62,Road-150 Red,2000,R,2011-07-01,
";

pub const SALES_DETAILS: &str = "\
sls_ord_num,sls_prd_key,sls_cust_id,sls_order_dt,sls_ship_dt,sls_due_dt,sls_sales,sls_quantity,sls_price
SO43697,BK-R93R-62,11000,20101229,20110105,20110110,3578,1,3578
SO43698,CO-RF-FR-R92B-58,11001,20101229,20110105,20110110,100,2,50
";

pub const CST_AZ12: &str = "\
CID,BDATE,GEN
NASAW00011000,1971-10-06,Female
AW00011001,1976-05-10,Male
";

pub const LOC_A101: &str = "\
CID,CNTRY
AW-00011000,Germany
AW-00011001,United States
";

pub const PX_CAT_G1V2: &str = "\
ID,CAT,SUBCAT,MAINTENANCE
CO_RF,Components,Road Frames,Yes
BK_R93,Bikes,Road Bikes,No
";

/// Raw CSV with a row that has more fields than the header
pub const RAGGED: &str = "\
a,b
1,2
3,4,5
";

/// A temp workspace with config rooted inside it
pub struct Workspace {
    pub dir: TempDir,
    pub cfg: PipelineConfig,
}

impl Workspace {
    /// Empty raw roots
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let cfg = PipelineConfig::with_base(dir.path());
        fs::create_dir_all(&cfg.crm.root).unwrap();
        fs::create_dir_all(&cfg.erp.root).unwrap();
        Self { dir, cfg }
    }

    /// All six raw extracts
    pub fn full() -> Self {
        let ws = Self::empty();
        ws.write_crm("cst_info.csv", CST_INFO);
        ws.write_crm("prd_info.csv", PRD_INFO);
        ws.write_crm("sales_details.csv", SALES_DETAILS);
        ws.write_erp("CST_AZ12.csv", CST_AZ12);
        ws.write_erp("LOC_A101.csv", LOC_A101);
        ws.write_erp("PX_CAT_G1V2.csv", PX_CAT_G1V2);
        ws
    }

    /// Every extract except the location one
    pub fn without_location() -> Self {
        let ws = Self::full();
        fs::remove_file(ws.cfg.erp.root.join("LOC_A101.csv")).unwrap();
        ws
    }

    pub fn write_crm(&self, name: &str, body: &str) -> PathBuf {
        write(&self.cfg.crm.root, name, body)
    }

    pub fn write_erp(&self, name: &str, body: &str) -> PathBuf {
        write(&self.cfg.erp.root, name, body)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

/// Names of the directories directly under `root`, sorted
pub fn subdirs(root: &Path) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Sorted names of the CSV files directly under `dir`
pub fn csv_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| name.ends_with(".csv"))
        .collect();
    names.sort();
    names
}
