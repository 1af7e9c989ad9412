use anyhow::{Context, Result};
use std::path::Path;

pub const SETTINGS_SHEET: &str = "SETTINGS";
pub const FABRIC_SHEET: &str = "FABRIC";
pub const INTERFACES_SHEET: &str = "INTERFACES";
pub const NETWORKS_SHEET: &str = "NETWORKS";

/// `KEY,VALUE` row from the SETTINGS sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingRow {
    pub row: usize,
    pub key: String,
    pub value: Option<String>,
}

/// `HOSTNAME,ROLE` row from the FABRIC sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FabricRow {
    pub row: usize,
    pub hostname: String,
    pub role: Option<String>,
}

/// Row from the INTERFACES sheet. Cells are kept raw; validation happens in the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRow {
    pub row: usize,
    pub hostname: String,
    pub port: Option<String>,
    pub speed: Option<String>,
    pub channelized: Option<String>,
    pub peer_hostname: Option<String>,
    pub peer_port: Option<String>,
    pub ae_idx: Option<String>,
}

/// Row from the NETWORKS sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkRow {
    pub row: usize,
    pub name: String,
    pub vlan_id: Option<String>,
    pub vrf: Option<String>,
    pub gateway: Option<String>,
    pub gateway6: Option<String>,
    pub static_routes_v4: Option<String>,
    pub static_routes_v6: Option<String>,
}

/// All sheets of one workbook, in sheet order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub settings: Vec<SettingRow>,
    pub fabric: Vec<FabricRow>,
    pub interfaces: Vec<InterfaceRow>,
    pub networks: Vec<NetworkRow>,
}

/// Load `SETTINGS.csv`, `FABRIC.csv`, `INTERFACES.csv` and `NETWORKS.csv` from a directory.
pub fn read_workbook(dir: &Path) -> Result<Workbook> {
    let settings = load_sheet(dir, SETTINGS_SHEET)?;
    let fabric = load_sheet(dir, FABRIC_SHEET)?;
    let interfaces = load_sheet(dir, INTERFACES_SHEET)?;
    let networks = load_sheet(dir, NETWORKS_SHEET)?;

    let workbook = Workbook {
        settings: settings
            .rows("KEY")
            .map(|(row, rec)| SettingRow {
                row,
                key: settings.cell(rec, "KEY").unwrap_or_default(),
                value: settings.cell(rec, "VALUE"),
            })
            .collect(),
        fabric: fabric
            .rows("HOSTNAME")
            .map(|(row, rec)| FabricRow {
                row,
                hostname: fabric.cell(rec, "HOSTNAME").unwrap_or_default(),
                role: fabric.cell(rec, "ROLE"),
            })
            .collect(),
        interfaces: interfaces
            .rows("HOSTNAME")
            .map(|(row, rec)| InterfaceRow {
                row,
                hostname: interfaces.cell(rec, "HOSTNAME").unwrap_or_default(),
                port: interfaces.cell(rec, "PORT"),
                speed: interfaces.cell(rec, "SPEED"),
                channelized: interfaces.cell(rec, "CHANNELIZED"),
                peer_hostname: interfaces.cell(rec, "PEER_HOSTNAME"),
                peer_port: interfaces.cell(rec, "PEER_PORT"),
                ae_idx: interfaces.cell(rec, "AE_IDX"),
            })
            .collect(),
        networks: networks
            .rows("NETWORKNAME")
            .map(|(row, rec)| NetworkRow {
                row,
                name: networks.cell(rec, "NETWORKNAME").unwrap_or_default(),
                vlan_id: networks.cell(rec, "VLAN_ID"),
                vrf: networks.cell(rec, "VRF"),
                gateway: networks.cell(rec, "GATEWAY"),
                gateway6: networks.cell(rec, "GATEWAY6"),
                static_routes_v4: networks.cell(rec, "STATIC_ROUTESv4"),
                static_routes_v6: networks.cell(rec, "STATIC_ROUTESv6"),
            })
            .collect(),
    };

    tracing::info!(
        "Loaded workbook {}: {} settings, {} devices, {} interfaces, {} networks",
        dir.display(),
        workbook.settings.len(),
        workbook.fabric.len(),
        workbook.interfaces.len(),
        workbook.networks.len()
    );
    Ok(workbook)
}

/// One CSV sheet with upper-cased headers
struct Sheet {
    name: &'static str,
    headers: Vec<String>,
    records: Vec<(usize, csv::StringRecord)>,
}

fn load_sheet(dir: &Path, name: &'static str) -> Result<Sheet> {
    let path = dir.join(format!("{}.csv", name));
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(&path)
        .with_context(|| format!("{} sheet missing ({})", name, path.display()))?;

    let headers = rdr
        .headers()
        .with_context(|| format!("reading {} header", name))?
        .iter()
        .map(|h| h.trim().to_ascii_uppercase())
        .collect();

    let mut records = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parsing {} sheet", name))?;
        // Header is row 1, so the first data record is row 2.
        let row = rec
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        records.push((row, rec));
    }

    Ok(Sheet { name, headers, records })
}

impl Sheet {
    fn column(&self, name: &str) -> Option<usize> {
        let name = name.to_ascii_uppercase();
        self.headers.iter().position(|h| *h == name)
    }

    /// Trimmed cell value; `None` for missing columns and blank cells
    fn cell(&self, rec: &csv::StringRecord, column: &str) -> Option<String> {
        let idx = self.column(column)?;
        rec.get(idx)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Records whose key column is non-blank
    fn rows<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (usize, &'a csv::StringRecord)> + 'a {
        if self.column(key).is_none() {
            tracing::warn!("{} sheet has no {} column", self.name, key);
        }
        self.records
            .iter()
            .filter(move |(_, rec)| self.cell(rec, key).is_some())
            .map(|(row, rec)| (*row, rec))
    }
}
