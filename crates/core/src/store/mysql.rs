//! MySQL store over the shared SIMRS (Khanza) schema.
//!
//! Queries are checked at runtime. Columns that may hold zero dates or unsigned integers are
//! cast in SQL (`CAST(.. AS CHAR)`, `CAST(.. AS SIGNED)`) so rows decode into plain Rust types.

use super::{
    AntrolStore, DrugMappingStore, HealthCheck, NotificationStore, QueueStore, ReportStore,
    RosterStore, TeamStore, VerificationStore,
};
use crate::antrol::{BookingReference, PrescriptionTimes, RecordedVisitTimes};
use crate::constants::{JABATAN_KETUA, REGISTRATION_CANCELLED};
use crate::error::{SimrsError, SimrsResult};
use crate::patient::parse_khanza_date;
use crate::ppra::mapping::{DrugMappingFields, DrugMappingRow, DrugRow};
use crate::ppra::report::{
    DiagnosisRow, ReportFilter, ReportSourceRow, RoomStayRow, SoapEntryRow,
};
use crate::ppra::team::TeamMemberRow;
use crate::ppra::{
    NotificationLog, PendingLine, PrescriptionLineDetail, PrescriptionLineKey, RosterEntry,
    StaffContact, VerificationPatch, VerificationRecord,
};
use crate::queue::ClinicRow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, QueryBuilder};

/// Digits-only phone column, matching `PhoneNumber::digits`.
const PHONE_DIGITS: &str = "REGEXP_REPLACE(p.no_telp, '[^0-9]', '')";

const SELECT_VERIFICATION: &str = r#"
    SELECT no_resep, kode_brng, aturan_pakai, keterangan, nik_petugas,
           petugas_telaah, status_telaah, catatan_telaah, tgl_telaah,
           petugas_persetujuan, status_persetujuan, catatan_persetujuan, tgl_persetujuan,
           updated_at
    FROM rsia_ppra_resep_verifikasi
    WHERE no_resep = ? AND kode_brng = ?
"#;

const SELECT_NOTIFICATION: &str = r#"
    SELECT no_resep, kode_brng, short_code, tgl_notif, status_notif
    FROM rsia_ppra_notif_log
"#;

const SELECT_TEAM_MEMBER: &str = r#"
    SELECT CAST(t.id AS SIGNED) AS id, t.nik, t.jabatan, t.role,
           pg.nama, pg.jbtn, pg.photo
    FROM rsia_tim_ppra t
    LEFT JOIN pegawai pg ON pg.nik = t.nik
"#;

const SELECT_DRUG_MAPPING: &str = r#"
    SELECT CAST(m.id AS SIGNED) AS id, m.kode_brng, m.rute_pemberian, m.nilai_ddd_who,
           CAST(m.status_notif AS CHAR) AS status_notif, db.nama_brng, db.kode_sat
    FROM rsia_ppra_mapping_obat m
    JOIN databarang db ON db.kode_brng = m.kode_brng
"#;

#[derive(sqlx::FromRow)]
struct LineDetailRow {
    no_resep: String,
    nama_brng: String,
    aturan_pakai: Option<String>,
    nm_pasien: String,
    tgl_lahir: Option<String>,
    berat_badan: Option<f64>,
}

impl From<LineDetailRow> for PrescriptionLineDetail {
    fn from(row: LineDetailRow) -> Self {
        PrescriptionLineDetail {
            no_resep: row.no_resep,
            nama_brng: row.nama_brng,
            aturan_pakai: row.aturan_pakai,
            nm_pasien: row.nm_pasien,
            tgl_lahir: parse_khanza_date(row.tgl_lahir.as_deref()),
            berat_badan: row.berat_badan,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to the hospital database.
    pub async fn connect(database_url: &str, max_connections: u32) -> SimrsResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Connected to hospital database (pool size {})", max_connections);
        Ok(Self::new(pool))
    }
}

fn like_pattern(keyword: &str) -> String {
    format!("%{keyword}%")
}

#[async_trait]
impl HealthCheck for MySqlStore {
    async fn ping(&self) -> SimrsResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn roster_by_suffix_sql() -> String {
    format!(
        r#"
        SELECT p.nip, p.nama, t.jabatan, t.role
        FROM petugas p
        JOIN rsia_tim_ppra t ON t.nik = p.nip
        WHERE {PHONE_DIGITS} LIKE CONCAT('%', ?)
        LIMIT 1
        "#
    )
}

#[async_trait]
impl RosterStore for MySqlStore {
    async fn find_roster_by_phone_suffix(&self, suffix: &str) -> SimrsResult<Option<RosterEntry>> {
        let entry = sqlx::query_as::<_, RosterEntry>(&roster_by_suffix_sql())
            .bind(suffix)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn find_chairman_contact(&self) -> SimrsResult<Option<StaffContact>> {
        let contact = sqlx::query_as::<_, StaffContact>(
            r#"
            SELECT p.nama, p.no_telp
            FROM rsia_tim_ppra t
            JOIN petugas p ON p.nip = t.nik
            WHERE t.jabatan = ? AND p.no_telp IS NOT NULL AND p.no_telp <> ''
            LIMIT 1
            "#,
        )
        .bind(JABATAN_KETUA)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn pharmacist_contacts(&self) -> SimrsResult<Vec<StaffContact>> {
        let contacts = sqlx::query_as::<_, StaffContact>(
            r#"
            SELECT p.nama, p.no_telp
            FROM rsia_tim_ppra t
            JOIN petugas p ON p.nip = t.nik
            WHERE (t.jabatan LIKE '%apoteker%' OR t.jabatan LIKE '%farmasi%')
              AND p.no_telp IS NOT NULL AND p.no_telp <> ''
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn staff_name(&self, nip: &str) -> SimrsResult<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT nama FROM petugas WHERE nip = ?")
            .bind(nip)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

#[async_trait]
impl VerificationStore for MySqlStore {
    async fn upsert_verification(
        &self,
        key: &PrescriptionLineKey,
        patch: &VerificationPatch,
        now: NaiveDateTime,
    ) -> SimrsResult<VerificationRecord> {
        let mut tx = self.pool.begin().await?;

        let locked = format!("{SELECT_VERIFICATION} FOR UPDATE");
        let existing = sqlx::query_as::<_, VerificationRecord>(&locked)
            .bind(key.no_resep.as_str())
            .bind(key.kode_brng.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let is_new = existing.is_none();
        let mut record = existing.unwrap_or_else(|| VerificationRecord::empty(key));
        record.apply(patch, now);

        let sql = if is_new {
            r#"
            INSERT INTO rsia_ppra_resep_verifikasi
                (aturan_pakai, keterangan, nik_petugas,
                 petugas_telaah, status_telaah, catatan_telaah, tgl_telaah,
                 petugas_persetujuan, status_persetujuan, catatan_persetujuan, tgl_persetujuan,
                 updated_at, no_resep, kode_brng)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        } else {
            r#"
            UPDATE rsia_ppra_resep_verifikasi SET
                aturan_pakai = ?, keterangan = ?, nik_petugas = ?,
                petugas_telaah = ?, status_telaah = ?, catatan_telaah = ?, tgl_telaah = ?,
                petugas_persetujuan = ?, status_persetujuan = ?, catatan_persetujuan = ?,
                tgl_persetujuan = ?, updated_at = ?
            WHERE no_resep = ? AND kode_brng = ?
            "#
        };
        sqlx::query(sql)
            .bind(&record.aturan_pakai)
            .bind(&record.keterangan)
            .bind(&record.nik_petugas)
            .bind(&record.petugas_telaah)
            .bind(&record.status_telaah)
            .bind(&record.catatan_telaah)
            .bind(record.tgl_telaah)
            .bind(&record.petugas_persetujuan)
            .bind(&record.status_persetujuan)
            .bind(&record.catatan_persetujuan)
            .bind(record.tgl_persetujuan)
            .bind(record.updated_at)
            .bind(&record.no_resep)
            .bind(&record.kode_brng)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn find_verification(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<VerificationRecord>> {
        let record = sqlx::query_as::<_, VerificationRecord>(SELECT_VERIFICATION)
            .bind(key.no_resep.as_str())
            .bind(key.kode_brng.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn prescription_line_detail(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<PrescriptionLineDetail>> {
        let row = sqlx::query_as::<_, LineDetailRow>(
            r#"
            SELECT ro.no_resep, db.nama_brng, rd.aturan_pakai, p.nm_pasien,
                   CAST(p.tgl_lahir AS CHAR) AS tgl_lahir,
                   (SELECT pr.berat + 0E0
                      FROM pemeriksaan_ranap pr
                     WHERE pr.no_rawat = ro.no_rawat AND pr.berat + 0E0 > 0
                     ORDER BY pr.tgl_perawatan DESC, pr.jam_rawat DESC
                     LIMIT 1) AS berat_badan
            FROM resep_obat ro
            JOIN reg_periksa rp ON rp.no_rawat = ro.no_rawat
            JOIN pasien p ON p.no_rkm_medis = rp.no_rkm_medis
            JOIN detail_pemberian_obat dpo
              ON dpo.no_rawat = ro.no_rawat
             AND dpo.tgl_perawatan = ro.tgl_perawatan
             AND dpo.jam = ro.jam
            JOIN databarang db ON db.kode_brng = dpo.kode_brng
            LEFT JOIN resep_dokter rd
              ON rd.no_resep = ro.no_resep AND rd.kode_brng = dpo.kode_brng
            WHERE ro.no_resep = ? AND dpo.kode_brng = ?
            LIMIT 1
            "#,
        )
        .bind(key.no_resep.as_str())
        .bind(key.kode_brng.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PrescriptionLineDetail::from))
    }
}

#[async_trait]
impl NotificationStore for MySqlStore {
    async fn find_notification_by_code(&self, code: &str) -> SimrsResult<Option<NotificationLog>> {
        let sql = format!("{SELECT_NOTIFICATION} WHERE short_code = ? ORDER BY tgl_notif DESC LIMIT 1");
        let log = sqlx::query_as::<_, NotificationLog>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(log)
    }

    async fn find_notification_for_line(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<NotificationLog>> {
        let sql = format!(
            "{SELECT_NOTIFICATION} WHERE no_resep = ? AND kode_brng = ? ORDER BY tgl_notif DESC LIMIT 1"
        );
        let log = sqlx::query_as::<_, NotificationLog>(&sql)
            .bind(key.no_resep.as_str())
            .bind(key.kode_brng.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(log)
    }

    async fn short_code_in_use(&self, code: &str, since: NaiveDateTime) -> SimrsResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rsia_ppra_notif_log WHERE short_code = ? AND tgl_notif >= ?",
        )
        .bind(code)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn insert_notification(&self, log: &NotificationLog) -> SimrsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rsia_ppra_notif_log (no_resep, kode_brng, short_code, tgl_notif, status_notif)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.no_resep)
        .bind(&log.kode_brng)
        .bind(&log.short_code)
        .bind(log.tgl_notif)
        .bind(&log.status_notif)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_antibiotic_lines(&self, since: NaiveDate) -> SimrsResult<Vec<PendingLine>> {
        let lines = sqlx::query_as::<_, PendingLine>(
            r#"
            SELECT rd.no_resep, rd.kode_brng, db.nama_brng, rd.aturan_pakai, rd.jml,
                   p.nm_pasien, ro.no_rawat, rp.no_rkm_medis, ro.tgl_perawatan
            FROM resep_dokter rd
            JOIN resep_obat ro ON ro.no_resep = rd.no_resep
            JOIN reg_periksa rp ON rp.no_rawat = ro.no_rawat
            JOIN pasien p ON p.no_rkm_medis = rp.no_rkm_medis
            JOIN rsia_ppra_mapping_obat m ON m.kode_brng = rd.kode_brng
            JOIN databarang db ON db.kode_brng = rd.kode_brng
            LEFT JOIN rsia_ppra_notif_log l
              ON l.no_resep = rd.no_resep AND l.kode_brng = rd.kode_brng
            WHERE l.no_resep IS NULL
              AND m.status_notif = '1'
              AND ro.tgl_perawatan >= ?
            ORDER BY ro.tgl_perawatan, ro.jam, rd.no_resep
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }
}

#[async_trait]
impl TeamStore for MySqlStore {
    async fn list_team(&self, keyword: Option<&str>) -> SimrsResult<Vec<TeamMemberRow>> {
        let mut qb = QueryBuilder::<MySql>::new(SELECT_TEAM_MEMBER);
        if let Some(keyword) = keyword {
            let like = like_pattern(keyword);
            qb.push(" WHERE (t.jabatan LIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR t.role LIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR pg.nama LIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR pg.nik LIKE ");
            qb.push_bind(like);
            qb.push(")");
        }
        qb.push(" ORDER BY t.id");

        let rows = qb
            .build_query_as::<TeamMemberRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn employee_exists(&self, nik: &str) -> SimrsResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pegawai WHERE nik = ?")
            .bind(nik)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn team_member_by_nik(&self, nik: &str) -> SimrsResult<Option<TeamMemberRow>> {
        let sql = format!("{SELECT_TEAM_MEMBER} WHERE t.nik = ? LIMIT 1");
        let row = sqlx::query_as::<_, TeamMemberRow>(&sql)
            .bind(nik)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn team_member(&self, id: i64) -> SimrsResult<Option<TeamMemberRow>> {
        let sql = format!("{SELECT_TEAM_MEMBER} WHERE t.id = ?");
        let row = sqlx::query_as::<_, TeamMemberRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_team_member(
        &self,
        nik: &str,
        jabatan: &str,
        role: Option<&str>,
    ) -> SimrsResult<TeamMemberRow> {
        let result = sqlx::query(
            r#"
            INSERT INTO rsia_tim_ppra (nik, jabatan, role, created_at, updated_at)
            VALUES (?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(nik)
        .bind(jabatan)
        .bind(role)
        .execute(&self.pool)
        .await?;

        let id = i64::try_from(result.last_insert_id())
            .map_err(|_| SimrsError::Database(sqlx::Error::RowNotFound))?;
        self.team_member(id)
            .await?
            .ok_or(SimrsError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_team_member(
        &self,
        id: i64,
        jabatan: &str,
        role: Option<&str>,
    ) -> SimrsResult<Option<TeamMemberRow>> {
        sqlx::query(
            "UPDATE rsia_tim_ppra SET jabatan = ?, role = ?, updated_at = NOW() WHERE id = ?",
        )
        .bind(jabatan)
        .bind(role)
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.team_member(id).await
    }

    async fn delete_team_member(&self, id: i64) -> SimrsResult<bool> {
        let result = sqlx::query("DELETE FROM rsia_tim_ppra WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_mapping_keyword(qb: &mut QueryBuilder<'_, MySql>, keyword: Option<&str>) {
    if let Some(keyword) = keyword {
        let like = like_pattern(keyword);
        qb.push(" WHERE (m.rute_pemberian LIKE ");
        qb.push_bind(like.clone());
        qb.push(" OR db.nama_brng LIKE ");
        qb.push_bind(like.clone());
        qb.push(" OR db.kode_brng LIKE ");
        qb.push_bind(like);
        qb.push(")");
    }
}

#[async_trait]
impl DrugMappingStore for MySqlStore {
    async fn list_drug_mappings(
        &self,
        keyword: Option<&str>,
        page: u32,
        limit: u32,
    ) -> SimrsResult<(Vec<DrugMappingRow>, u64)> {
        let mut count_qb = QueryBuilder::<MySql>::new(
            "SELECT COUNT(*) FROM rsia_ppra_mapping_obat m JOIN databarang db ON db.kode_brng = m.kode_brng",
        );
        push_mapping_keyword(&mut count_qb, keyword);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let mut qb = QueryBuilder::<MySql>::new(SELECT_DRUG_MAPPING);
        push_mapping_keyword(&mut qb, keyword);
        qb.push(" ORDER BY db.nama_brng ASC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<DrugMappingRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, u64::try_from(total).unwrap_or_default()))
    }

    async fn drug_exists(&self, kode_brng: &str) -> SimrsResult<bool> {
        Ok(self.drug_name(kode_brng).await?.is_some())
    }

    async fn drug_name(&self, kode_brng: &str) -> SimrsResult<Option<String>> {
        let name =
            sqlx::query_scalar::<_, String>("SELECT nama_brng FROM databarang WHERE kode_brng = ?")
                .bind(kode_brng)
                .fetch_optional(&self.pool)
                .await?;
        Ok(name)
    }

    async fn drug_mapping_by_drug(&self, kode_brng: &str) -> SimrsResult<Option<DrugMappingRow>> {
        let sql = format!("{SELECT_DRUG_MAPPING} WHERE m.kode_brng = ? LIMIT 1");
        let row = sqlx::query_as::<_, DrugMappingRow>(&sql)
            .bind(kode_brng)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn drug_mapping(&self, id: i64) -> SimrsResult<Option<DrugMappingRow>> {
        let sql = format!("{SELECT_DRUG_MAPPING} WHERE m.id = ?");
        let row = sqlx::query_as::<_, DrugMappingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_drug_mapping(
        &self,
        kode_brng: &str,
        fields: &DrugMappingFields,
    ) -> SimrsResult<DrugMappingRow> {
        let result = sqlx::query(
            r#"
            INSERT INTO rsia_ppra_mapping_obat
                (kode_brng, rute_pemberian, nilai_ddd_who, status_notif, created_at, updated_at)
            VALUES (?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(kode_brng)
        .bind(&fields.rute_pemberian)
        .bind(&fields.nilai_ddd_who)
        .bind(&fields.status_notif)
        .execute(&self.pool)
        .await?;

        let id = i64::try_from(result.last_insert_id())
            .map_err(|_| SimrsError::Database(sqlx::Error::RowNotFound))?;
        self.drug_mapping(id)
            .await?
            .ok_or(SimrsError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_drug_mapping(
        &self,
        id: i64,
        fields: &DrugMappingFields,
    ) -> SimrsResult<Option<DrugMappingRow>> {
        sqlx::query(
            r#"
            UPDATE rsia_ppra_mapping_obat SET
                rute_pemberian = COALESCE(?, rute_pemberian),
                nilai_ddd_who = COALESCE(?, nilai_ddd_who),
                status_notif = COALESCE(?, status_notif),
                updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(&fields.rute_pemberian)
        .bind(&fields.nilai_ddd_who)
        .bind(&fields.status_notif)
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.drug_mapping(id).await
    }

    async fn delete_drug_mapping(&self, id: i64) -> SimrsResult<bool> {
        let result = sqlx::query("DELETE FROM rsia_ppra_mapping_obat WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_unmapped_drugs(&self, keyword: &str, limit: u32) -> SimrsResult<Vec<DrugRow>> {
        let like = like_pattern(keyword);
        let rows = sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT db.kode_brng, db.nama_brng, db.kode_sat
            FROM databarang db
            WHERE db.status = '1'
              AND (db.nama_brng LIKE ? OR db.kode_brng LIKE ?)
              AND NOT EXISTS (
                  SELECT 1 FROM rsia_ppra_mapping_obat m WHERE m.kode_brng = db.kode_brng
              )
            LIMIT ?
            "#,
        )
        .bind(&like)
        .bind(&like)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ReportStore for MySqlStore {
    async fn report_rows(&self, filter: &ReportFilter) -> SimrsResult<Vec<ReportSourceRow>> {
        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT ro.no_resep, ro.no_rawat, p.nm_pasien, p.no_rkm_medis, d.nm_dokter,
                   rp.kd_dokter, d.kd_sps, CAST(p.tgl_lahir AS CHAR) AS tgl_lahir,
                   db.kode_brng, db.nama_brng, m.rute_pemberian, m.nilai_ddd_who,
                   rd.aturan_pakai AS aturan_pakai_dokter, dpo.jml,
                   v.aturan_pakai AS aturan_pakai_verif, v.status_telaah, v.status_persetujuan,
                   v.catatan_telaah, v.catatan_persetujuan,
                   ro.tgl_perawatan, CAST(ro.jam AS CHAR) AS jam,
                   CAST(ro.status AS CHAR) AS status, db.kode_sat, db.isi
            FROM resep_obat ro
            JOIN reg_periksa rp ON rp.no_rawat = ro.no_rawat
            JOIN pasien p ON p.no_rkm_medis = rp.no_rkm_medis
            JOIN dokter d ON d.kd_dokter = rp.kd_dokter
            JOIN detail_pemberian_obat dpo
              ON dpo.no_rawat = ro.no_rawat
             AND dpo.tgl_perawatan = ro.tgl_perawatan
             AND dpo.jam = ro.jam
            JOIN databarang db ON db.kode_brng = dpo.kode_brng
            JOIN rsia_ppra_mapping_obat m ON m.kode_brng = db.kode_brng
            LEFT JOIN resep_dokter rd
              ON rd.no_resep = ro.no_resep AND rd.kode_brng = dpo.kode_brng
            LEFT JOIN rsia_ppra_resep_verifikasi v
              ON v.no_resep = ro.no_resep AND v.kode_brng = dpo.kode_brng
            WHERE ro.status LIKE 'ranap%'
              AND ro.tgl_perawatan BETWEEN
            "#,
        );
        qb.push_bind(filter.start);
        qb.push(" AND ");
        qb.push_bind(filter.end);

        if let Some(kd_sps) = &filter.kd_sps {
            qb.push(" AND d.kd_sps = ");
            qb.push_bind(kd_sps.clone());
        }
        if let Some(kd_dokter) = &filter.kd_dokter {
            qb.push(" AND rp.kd_dokter = ");
            qb.push_bind(kd_dokter.clone());
        }
        if let Some(search) = &filter.search {
            let like = like_pattern(search);
            qb.push(" AND (p.nm_pasien LIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR p.no_rkm_medis LIKE ");
            qb.push_bind(like.clone());
            qb.push(" OR rp.no_rawat LIKE ");
            qb.push_bind(like);
            qb.push(")");
        }
        qb.push(" ORDER BY ro.tgl_perawatan, ro.jam");

        let rows = qb
            .build_query_as::<ReportSourceRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn diagnoses(&self, no_rawat: &[String]) -> SimrsResult<Vec<DiagnosisRow>> {
        if no_rawat.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT dp.no_rawat, py.nm_penyakit
            FROM diagnosa_pasien dp
            JOIN penyakit py ON py.kd_penyakit = dp.kd_penyakit
            WHERE dp.no_rawat IN (
            "#,
        );
        let mut ids = qb.separated(", ");
        for id in no_rawat {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") ORDER BY dp.prioritas ASC");

        let rows = qb
            .build_query_as::<DiagnosisRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn room_stays(&self, no_rawat: &[String]) -> SimrsResult<Vec<RoomStayRow>> {
        if no_rawat.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT no_rawat,
                   CAST(tgl_masuk AS CHAR) AS tgl_masuk, CAST(jam_masuk AS CHAR) AS jam_masuk,
                   CAST(tgl_keluar AS CHAR) AS tgl_keluar, CAST(jam_keluar AS CHAR) AS jam_keluar
            FROM kamar_inap
            WHERE no_rawat IN (
            "#,
        );
        let mut ids = qb.separated(", ");
        for id in no_rawat {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") ORDER BY tgl_masuk ASC, jam_masuk ASC");

        let rows = qb
            .build_query_as::<RoomStayRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn soap_entries(&self, no_rawat: &str) -> SimrsResult<Vec<SoapEntryRow>> {
        let rows = sqlx::query_as::<_, SoapEntryRow>(
            r#"
            SELECT tgl_perawatan, CAST(jam_rawat AS CHAR) AS jam_rawat, rtl
            FROM pemeriksaan_ranap
            WHERE no_rawat = ?
            ORDER BY tgl_perawatan DESC, jam_rawat DESC
            "#,
        )
        .bind(no_rawat)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl QueueStore for MySqlStore {
    async fn active_clinics(&self) -> SimrsResult<Vec<ClinicRow>> {
        let rows = sqlx::query_as::<_, ClinicRow>(
            r#"
            SELECT kd_poli, nm_poli
            FROM poliklinik
            WHERE status = '1' AND kd_poli <> '-'
            ORDER BY nm_poli
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn clinic_quota(&self, kd_poli: &str, hari_kerja: &str) -> SimrsResult<i64> {
        let quota = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(COALESCE(SUM(kuota), 0) AS SIGNED)
            FROM jadwal
            WHERE kd_poli = ? AND hari_kerja = ?
            "#,
        )
        .bind(kd_poli)
        .bind(hari_kerja)
        .fetch_one(&self.pool)
        .await?;
        Ok(quota)
    }

    async fn registration_count(&self, kd_poli: &str, date: NaiveDate) -> SimrsResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reg_periksa
            WHERE kd_poli = ? AND tgl_registrasi = ? AND stts <> ?
            "#,
        )
        .bind(kd_poli)
        .bind(date)
        .bind(REGISTRATION_CANCELLED)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl AntrolStore for MySqlStore {
    async fn booking_reference(&self, nobooking: &str) -> SimrsResult<Option<BookingReference>> {
        let reference = sqlx::query_as::<_, BookingReference>(
            r#"
            SELECT no_rawat, norm, CAST(tanggalperiksa AS CHAR) AS tanggalperiksa
            FROM referensi_mobilejkn_bpjs
            WHERE nobooking = ?
            LIMIT 1
            "#,
        )
        .bind(nobooking)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reference)
    }

    async fn registration_exists(&self, no_rawat: &str) -> SimrsResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reg_periksa WHERE no_rawat = ?")
            .bind(no_rawat)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn latest_registration(
        &self,
        no_rkm_medis: &str,
        date: NaiveDate,
    ) -> SimrsResult<Option<String>> {
        let no_rawat = sqlx::query_scalar::<_, String>(
            r#"
            SELECT no_rawat
            FROM reg_periksa
            WHERE no_rkm_medis = ? AND tgl_registrasi = ?
            ORDER BY jam_reg DESC
            LIMIT 1
            "#,
        )
        .bind(no_rkm_medis)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(no_rawat)
    }

    async fn recorded_visit_times(&self, no_rawat: &str) -> SimrsResult<RecordedVisitTimes> {
        let exam = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            r#"
            SELECT CAST(tgl_perawatan AS CHAR), CAST(jam_rawat AS CHAR)
            FROM pemeriksaan_ralan
            WHERE no_rawat = ?
            ORDER BY tgl_perawatan, jam_rawat
            LIMIT 1
            "#,
        )
        .bind(no_rawat)
        .fetch_optional(&self.pool)
        .await?;

        let estimated_end = sqlx::query_scalar::<_, Option<String>>(
            "SELECT CAST(jam_periksa AS CHAR) FROM rsia_estimasi_poli WHERE no_rawat = ? LIMIT 1",
        )
        .bind(no_rawat)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        let finished_at = sqlx::query_scalar::<_, Option<String>>(
            "SELECT CAST(jam_periksa AS CHAR) FROM rsia_selesai_poli WHERE no_rawat = ? LIMIT 1",
        )
        .bind(no_rawat)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        let prescription = sqlx::query_as::<_, PrescriptionTimes>(
            r#"
            SELECT CAST(tgl_peresepan AS CHAR) AS prescribed_date,
                   CAST(jam_peresepan AS CHAR) AS prescribed_time,
                   CAST(tgl_perawatan AS CHAR) AS prepared_date,
                   CAST(jam AS CHAR) AS prepared_time,
                   CAST(tgl_penyerahan AS CHAR) AS handed_over_date,
                   CAST(jam_penyerahan AS CHAR) AS handed_over_time
            FROM resep_obat
            WHERE no_rawat = ? AND CAST(tgl_peresepan AS CHAR) <> '0000-00-00'
            ORDER BY no_resep DESC
            LIMIT 1
            "#,
        )
        .bind(no_rawat)
        .fetch_optional(&self.pool)
        .await?;

        let (exam_date, exam_time) = exam.unwrap_or_default();
        Ok(RecordedVisitTimes {
            exam_date,
            exam_time,
            estimated_end,
            finished_at,
            prescription,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_lookup_compares_digits_only() {
        let sql = roster_by_suffix_sql();
        assert!(sql.contains("REGEXP_REPLACE(p.no_telp, '[^0-9]', '')"));
        assert!(sql.contains("LIKE CONCAT('%', ?)"));
    }
}
