//! PPRA team roster.
//!
//! The roster decides who may answer notifications and in which capacity: pharmacists review,
//! every other member approves, and the member whose position is `Ketua` receives forwarded
//! approvals.

use crate::constants::JABATAN_ORDER;
use crate::error::{SimrsError, SimrsResult};
use crate::store::SharedStore;
use api_shared::dto::{CreateTeamMemberReq, Employee, TeamMember, UpdateTeamMemberReq};
use simrs_types::NonEmptyText;

/// A roster row joined with the employee it refers to.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct TeamMemberRow {
    pub id: i64,
    pub nik: String,
    pub jabatan: String,
    pub role: Option<String>,
    pub nama: Option<String>,
    pub jbtn: Option<String>,
    pub photo: Option<String>,
}

impl From<TeamMemberRow> for TeamMember {
    fn from(row: TeamMemberRow) -> Self {
        let pegawai = row.nama.map(|nama| Employee {
            nik: row.nik.clone(),
            nama,
            jbtn: row.jbtn,
            photo: row.photo,
        });
        TeamMember {
            id: row.id,
            nik: row.nik,
            jabatan: row.jabatan,
            role: row.role,
            pegawai,
        }
    }
}

/// Position rank used for ordering. Positions outside `JABATAN_ORDER` rank 0 and so come
/// before the chairman, the same as the roster screen's `FIELD(jabatan, ...)` ordering.
fn jabatan_rank(jabatan: &str) -> usize {
    JABATAN_ORDER
        .iter()
        .position(|j| *j == jabatan)
        .map_or(0, |i| i + 1)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: &str, field: &str) -> SimrsResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| SimrsError::InvalidInput(format!("{field} is required")))
}

#[derive(Clone)]
pub struct TeamService {
    store: SharedStore,
}

impl TeamService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Lists the roster by position: unlisted positions, then chairman down to members.
    pub async fn list(&self, keyword: Option<&str>) -> SimrsResult<Vec<TeamMember>> {
        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let mut rows = self.store.list_team(keyword).await?;
        // Stable sort keeps storage order within a position.
        rows.sort_by_key(|r| jabatan_rank(&r.jabatan));
        Ok(rows.into_iter().map(TeamMember::from).collect())
    }

    /// Adds an employee to the roster.
    ///
    /// # Errors
    /// `InvalidInput` when the employee does not exist or a field is blank, `Duplicate` when
    /// the employee is already on the roster.
    pub async fn create(&self, req: CreateTeamMemberReq) -> SimrsResult<TeamMember> {
        let nik = required(&req.nik, "nik")?;
        let jabatan = required(&req.jabatan, "jabatan")?;

        if !self.store.employee_exists(nik.as_str()).await? {
            return Err(SimrsError::InvalidInput(format!(
                "Pegawai dengan NIK {nik} tidak ditemukan"
            )));
        }
        if self.store.team_member_by_nik(nik.as_str()).await?.is_some() {
            return Err(SimrsError::Duplicate(
                "Pegawai ini sudah masuk dalam Tim PPRA".into(),
            ));
        }

        let role = blank_to_none(req.role);
        let row = self
            .store
            .insert_team_member(nik.as_str(), jabatan.as_str(), role.as_deref())
            .await?;
        tracing::info!("Added {} to the PPRA team as {}", row.nik, row.jabatan);
        Ok(row.into())
    }

    pub async fn update(&self, id: i64, req: UpdateTeamMemberReq) -> SimrsResult<TeamMember> {
        if self.store.team_member(id).await?.is_none() {
            return Err(SimrsError::NotFound("Data tidak ditemukan".into()));
        }
        let jabatan = required(&req.jabatan, "jabatan")?;
        let role = blank_to_none(req.role);

        self.store
            .update_team_member(id, jabatan.as_str(), role.as_deref())
            .await?
            .map(TeamMember::from)
            .ok_or_else(|| SimrsError::NotFound("Data tidak ditemukan".into()))
    }

    pub async fn delete(&self, id: i64) -> SimrsResult<()> {
        if self.store.delete_team_member(id).await? {
            tracing::info!("Removed PPRA team member {}", id);
            Ok(())
        } else {
            Err(SimrsError::NotFound("Data tidak ditemukan".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, StaffRow, TeamRow};
    use std::sync::Arc;

    fn service() -> (TeamService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| {
            t.staff.push(StaffRow::new("A1", "apt. Dewi", Some("0812")));
            t.staff.push(StaffRow::new("K1", "dr. Hasan", None));
            t.staff.push(StaffRow::new("S1", "Ns. Sari", None));
            t.staff.push(StaffRow::new("X1", "Budi", None));
        });
        (TeamService::new(store.clone()), store)
    }

    fn create_req(nik: &str, jabatan: &str) -> CreateTeamMemberReq {
        CreateTeamMemberReq {
            nik: nik.into(),
            jabatan: jabatan.into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn list_orders_by_position() {
        let (svc, store) = service();
        store.with_tables(|t| {
            t.team.push(TeamRow::new(1, "A1", "Anggota", Some("Apoteker")));
            t.team.push(TeamRow::new(2, "X1", "Konsultan", None));
            t.team.push(TeamRow::new(3, "S1", "Sekretaris", None));
            t.team.push(TeamRow::new(4, "K1", "Ketua", None));
        });

        let list = svc.list(None).await.unwrap();
        let order: Vec<_> = list.iter().map(|m| m.jabatan.as_str()).collect();
        assert_eq!(order, vec!["Konsultan", "Ketua", "Sekretaris", "Anggota"]);
        assert_eq!(list[1].pegawai.as_ref().unwrap().nama, "dr. Hasan");
    }

    #[test]
    fn unlisted_positions_rank_before_chairman() {
        assert_eq!(jabatan_rank("Konsultan"), 0);
        assert_eq!(jabatan_rank("Ketua"), 1);
        assert_eq!(jabatan_rank("Anggota"), 4);
        assert!(jabatan_rank("ketua") < jabatan_rank("Ketua"));
    }

    #[tokio::test]
    async fn list_filters_by_keyword_on_role_and_name() {
        let (svc, store) = service();
        store.with_tables(|t| {
            t.team.push(TeamRow::new(1, "A1", "Anggota", Some("Apoteker")));
            t.team.push(TeamRow::new(2, "K1", "Ketua", None));
        });

        let by_role = svc.list(Some("apoteker")).await.unwrap();
        assert_eq!(by_role.len(), 1);
        assert_eq!(by_role[0].nik, "A1");

        let by_name = svc.list(Some("hasan")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].nik, "K1");

        assert_eq!(svc.list(Some("  ")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_unknown_employee_and_duplicates() {
        let (svc, _) = service();

        let unknown = svc.create(create_req("NOPE", "Anggota")).await.unwrap_err();
        assert_eq!(unknown.status_code(), 422);

        let created = svc.create(create_req("A1", "Anggota")).await.unwrap();
        assert_eq!(created.nik, "A1");

        let dup = svc.create(create_req("A1", "Ketua")).await.unwrap_err();
        assert!(matches!(dup, SimrsError::Duplicate(ref m) if m.contains("sudah masuk")));
    }

    #[tokio::test]
    async fn create_requires_jabatan() {
        let (svc, _) = service();
        let err = svc.create(create_req("A1", " ")).await.unwrap_err();
        assert!(matches!(err, SimrsError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let (svc, _) = service();
        let created = svc.create(create_req("A1", "Anggota")).await.unwrap();

        let updated = svc
            .update(
                created.id,
                UpdateTeamMemberReq {
                    jabatan: "Wakil Ketua".into(),
                    role: Some(" ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.jabatan, "Wakil Ketua");
        assert_eq!(updated.role, None);

        let missing = svc
            .update(999, UpdateTeamMemberReq::default())
            .await
            .unwrap_err();
        assert_eq!(missing.status_code(), 404);

        svc.delete(created.id).await.unwrap();
        assert_eq!(svc.delete(created.id).await.unwrap_err().status_code(), 404);
    }
}
