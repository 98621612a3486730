//! Antibiotic drug mapping.
//!
//! A drug becomes a PPRA antibiotic by being mapped: the mapping carries the administration
//! route, the WHO defined daily dose used by the report and the flag that enables WhatsApp
//! notifications for new prescriptions of the drug.

use crate::constants::{DEFAULT_PAGE_LIMIT, DRUG_SEARCH_LIMIT};
use crate::error::{SimrsError, SimrsResult};
use crate::store::SharedStore;
use api_shared::dto::{
    CreateDrugMappingReq, Drug, DrugMapping, DrugMappingListQuery, DrugMappingPage,
    UpdateDrugMappingReq,
};
use simrs_types::NonEmptyText;

const MAX_PAGE_LIMIT: u32 = 100;

/// A mapping row joined with its drug.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct DrugMappingRow {
    pub id: i64,
    pub kode_brng: String,
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    pub status_notif: Option<String>,
    pub nama_brng: Option<String>,
    pub kode_sat: Option<String>,
}

impl From<DrugMappingRow> for DrugMapping {
    fn from(row: DrugMappingRow) -> Self {
        let barang = row.nama_brng.map(|nama_brng| Drug {
            kode_brng: row.kode_brng.clone(),
            nama_brng,
            kode_sat: row.kode_sat,
        });
        DrugMapping {
            id: row.id,
            kode_brng: row.kode_brng,
            rute_pemberian: row.rute_pemberian,
            nilai_ddd_who: row.nilai_ddd_who,
            status_notif: row.status_notif,
            barang,
        }
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct DrugRow {
    pub kode_brng: String,
    pub nama_brng: String,
    pub kode_sat: Option<String>,
}

impl From<DrugRow> for Drug {
    fn from(row: DrugRow) -> Self {
        Drug {
            kode_brng: row.kode_brng,
            nama_brng: row.nama_brng,
            kode_sat: row.kode_sat,
        }
    }
}

/// Editable mapping columns. On update, `None` leaves the stored value as it is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrugMappingFields {
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    pub status_notif: Option<String>,
}

impl DrugMappingFields {
    fn validated(
        rute_pemberian: Option<String>,
        nilai_ddd_who: Option<String>,
        status_notif: Option<String>,
    ) -> SimrsResult<Self> {
        let status_notif = status_notif.map(|s| s.trim().to_string());
        if let Some(flag) = status_notif.as_deref() {
            if flag != "0" && flag != "1" {
                return Err(SimrsError::InvalidInput(
                    "status_notif must be 0 or 1".into(),
                ));
            }
        }
        Ok(Self {
            rute_pemberian,
            nilai_ddd_who,
            status_notif,
        })
    }

    /// Merges these fields over an existing row.
    pub fn apply_to(&self, row: &mut DrugMappingRow) {
        if let Some(v) = &self.rute_pemberian {
            row.rute_pemberian = Some(v.clone());
        }
        if let Some(v) = &self.nilai_ddd_who {
            row.nilai_ddd_who = Some(v.clone());
        }
        if let Some(v) = &self.status_notif {
            row.status_notif = Some(v.clone());
        }
    }
}

/// Page number and size after defaults and clamping.
pub fn page_window(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(MAX_PAGE_LIMIT);
    (page, limit)
}

fn last_page(total: u64, limit: u32) -> u32 {
    let pages = total.div_ceil(u64::from(limit.max(1)));
    u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
}

#[derive(Clone)]
pub struct DrugMappingService {
    store: SharedStore,
}

impl DrugMappingService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: DrugMappingListQuery) -> SimrsResult<DrugMappingPage> {
        let (page, limit) = page_window(query.page, query.limit);
        let keyword = query
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let (rows, total) = self.store.list_drug_mappings(keyword, page, limit).await?;
        Ok(DrugMappingPage {
            data: rows.into_iter().map(DrugMapping::from).collect(),
            current_page: page,
            per_page: limit,
            total,
            last_page: last_page(total, limit),
        })
    }

    pub async fn show(&self, id: i64) -> SimrsResult<DrugMapping> {
        self.store
            .drug_mapping(id)
            .await?
            .map(DrugMapping::from)
            .ok_or_else(|| SimrsError::NotFound("Data tidak ditemukan".into()))
    }

    /// Maps a drug as a PPRA antibiotic.
    ///
    /// # Errors
    /// `InvalidInput` for an unknown drug or a bad flag, `Duplicate` when the drug is already
    /// mapped.
    pub async fn create(&self, req: CreateDrugMappingReq) -> SimrsResult<DrugMapping> {
        let kode_brng = NonEmptyText::new(&req.kode_brng)
            .map_err(|_| SimrsError::InvalidInput("kode_brng is required".into()))?;
        let fields =
            DrugMappingFields::validated(req.rute_pemberian, req.nilai_ddd_who, req.status_notif)?;

        if !self.store.drug_exists(kode_brng.as_str()).await? {
            return Err(SimrsError::InvalidInput(format!(
                "Obat {kode_brng} tidak ditemukan"
            )));
        }
        if self
            .store
            .drug_mapping_by_drug(kode_brng.as_str())
            .await?
            .is_some()
        {
            return Err(SimrsError::Duplicate("Obat ini sudah dimapping".into()));
        }

        let row = self
            .store
            .insert_drug_mapping(kode_brng.as_str(), &fields)
            .await?;
        tracing::info!("Mapped {} as PPRA antibiotic", row.kode_brng);
        Ok(row.into())
    }

    pub async fn update(&self, id: i64, req: UpdateDrugMappingReq) -> SimrsResult<DrugMapping> {
        if self.store.drug_mapping(id).await?.is_none() {
            return Err(SimrsError::NotFound("Data tidak ditemukan".into()));
        }
        let fields =
            DrugMappingFields::validated(req.rute_pemberian, req.nilai_ddd_who, req.status_notif)?;

        self.store
            .update_drug_mapping(id, &fields)
            .await?
            .map(DrugMapping::from)
            .ok_or_else(|| SimrsError::NotFound("Data tidak ditemukan".into()))
    }

    pub async fn delete(&self, id: i64) -> SimrsResult<()> {
        if self.store.delete_drug_mapping(id).await? {
            Ok(())
        } else {
            Err(SimrsError::NotFound("Data tidak ditemukan".into()))
        }
    }

    /// Active drugs not mapped yet, for the mapping picker.
    pub async fn search_unmapped(&self, keyword: Option<&str>) -> SimrsResult<Vec<Drug>> {
        let keyword = keyword.map(str::trim).unwrap_or_default();
        let rows = self
            .store
            .search_unmapped_drugs(keyword, DRUG_SEARCH_LIMIT)
            .await?;
        Ok(rows.into_iter().map(Drug::from).collect())
    }
}
