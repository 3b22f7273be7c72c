use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use raffle_sdk::objects::{ParticipantSnapshot, UnitSnapshot, WinnerResponse};
use uuid::Uuid;

/// A durable winner record.
///
/// Participant, district and region fields are copies taken at draw time;
/// later edits to the reference data do not change them.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WinnerRecord {
    pub id: Uuid,
    pub participant_id: Option<Uuid>,
    pub participant_fio: CompactString,
    pub participant_telefon: Option<CompactString>,
    pub participant_manzil: Option<String>,
    pub district_id: Uuid,
    pub district_nomi: CompactString,
    pub district_soato: Option<CompactString>,
    pub region_id: Uuid,
    pub region_nomi: CompactString,
    pub region_soato: Option<CompactString>,
    pub selected_at: time::OffsetDateTime,
}

impl From<WinnerRecord> for WinnerResponse {
    fn from(value: WinnerRecord) -> Self {
        WinnerResponse {
            id: value.id,
            participant: ParticipantSnapshot {
                id: value.participant_id,
                fio: value.participant_fio,
                telefon: value.participant_telefon,
                manzil: value.participant_manzil,
            },
            district: UnitSnapshot {
                id: value.district_id,
                nomi: value.district_nomi,
                soato: value.district_soato,
            },
            region: UnitSnapshot {
                id: value.region_id,
                nomi: value.region_nomi,
                soato: value.region_soato,
            },
            selected_at: value.selected_at,
        }
    }
}

/// Data for inserting a new winner record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWinner {
    pub participant_id: Uuid,
    pub participant_fio: CompactString,
    pub participant_telefon: Option<CompactString>,
    pub participant_manzil: Option<String>,
    pub district_id: Uuid,
    pub district_nomi: CompactString,
    pub district_soato: Option<CompactString>,
    pub region_id: Uuid,
    pub region_nomi: CompactString,
    pub region_soato: Option<CompactString>,
}

const WINNER_COLUMNS: &str = "id, participant_id, participant_fio, participant_telefon, \
    participant_manzil, district_id, district_nomi, district_soato, region_id, region_nomi, \
    region_soato, selected_at";

#[derive(Debug, Clone)]
/// Insert a winner record.
///
/// Fails with a unique violation when the participant already has a record.
pub struct InsertWinner {
    pub id: Uuid,
    pub winner: NewWinner,
}

impl Processor<InsertWinner> for DatabaseProcessor {
    type Output = WinnerRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertWinner")]
    async fn process(&self, insert: InsertWinner) -> Result<WinnerRecord, sqlx::Error> {
        let w = insert.winner;
        let sql = format!(
            "INSERT INTO winners \
            (id, participant_id, participant_fio, participant_telefon, participant_manzil, \
            district_id, district_nomi, district_soato, region_id, region_nomi, region_soato) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
            RETURNING {WINNER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, WinnerRecord>(&sql)
            .bind(insert.id)
            .bind(w.participant_id)
            .bind(w.participant_fio)
            .bind(w.participant_telefon)
            .bind(w.participant_manzil)
            .bind(w.district_id)
            .bind(w.district_nomi)
            .bind(w.district_soato)
            .bind(w.region_id)
            .bind(w.region_nomi)
            .bind(w.region_soato)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
/// Delete every winner record. Returns the number of rows removed.
pub struct DeleteAllWinners;

impl Processor<DeleteAllWinners> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteAllWinners")]
    async fn process(&self, _query: DeleteAllWinners) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM winners")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Participant ids of every winner record that has one.
pub struct ListWinnerParticipantIds;

impl Processor<ListWinnerParticipantIds> for DatabaseProcessor {
    type Output = Vec<Uuid>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWinnerParticipantIds")]
    async fn process(&self, _query: ListWinnerParticipantIds) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT participant_id FROM winners WHERE participant_id IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[derive(Debug, Clone)]
pub struct GetWinnerByParticipant {
    pub participant_id: Uuid,
}

impl Processor<GetWinnerByParticipant> for DatabaseProcessor {
    type Output = Option<WinnerRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWinnerByParticipant")]
    async fn process(
        &self,
        query: GetWinnerByParticipant,
    ) -> Result<Option<WinnerRecord>, sqlx::Error> {
        let sql = format!("SELECT {WINNER_COLUMNS} FROM winners WHERE participant_id = $1");
        let record = sqlx::query_as::<_, WinnerRecord>(&sql)
            .bind(query.participant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
pub struct GetWinnerById {
    pub id: Uuid,
}

impl Processor<GetWinnerById> for DatabaseProcessor {
    type Output = Option<WinnerRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWinnerById")]
    async fn process(&self, query: GetWinnerById) -> Result<Option<WinnerRecord>, sqlx::Error> {
        let sql = format!("SELECT {WINNER_COLUMNS} FROM winners WHERE id = $1");
        let record = sqlx::query_as::<_, WinnerRecord>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
pub struct GetLatestWinner;

impl Processor<GetLatestWinner> for DatabaseProcessor {
    type Output = Option<WinnerRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLatestWinner")]
    async fn process(&self, _query: GetLatestWinner) -> Result<Option<WinnerRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {WINNER_COLUMNS} FROM winners ORDER BY selected_at DESC, id DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, WinnerRecord>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
/// List winner records with pagination and optional filters, newest first.
pub struct ListWinners {
    pub limit: i64,
    pub offset: i64,
    pub region_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
}

impl Processor<ListWinners> for DatabaseProcessor {
    type Output = Vec<WinnerRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWinners")]
    async fn process(&self, query: ListWinners) -> Result<Vec<WinnerRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {WINNER_COLUMNS} FROM winners \
            WHERE ($1::uuid IS NULL OR region_id = $1) \
              AND ($2::uuid IS NULL OR district_id = $2) \
            ORDER BY selected_at DESC, id DESC \
            LIMIT $3 OFFSET $4"
        );
        let records = sqlx::query_as::<_, WinnerRecord>(&sql)
            .bind(query.region_id)
            .bind(query.district_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}

#[derive(Debug, Clone)]
pub struct CountWinners {
    pub region_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
}

impl Processor<CountWinners> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountWinners")]
    async fn process(&self, query: CountWinners) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM winners
            WHERE ($1::uuid IS NULL OR region_id = $1)
              AND ($2::uuid IS NULL OR district_id = $2)
            "#,
        )
        .bind(query.region_id)
        .bind(query.district_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RegionWinnerRow {
    pub region: CompactString,
    pub count: i64,
}

#[derive(Debug, Clone)]
/// Winner count per region snapshot name, highest first.
pub struct CountWinnersByRegion;

impl Processor<CountWinnersByRegion> for DatabaseProcessor {
    type Output = Vec<RegionWinnerRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountWinnersByRegion")]
    async fn process(&self, _query: CountWinnersByRegion) -> Result<Vec<RegionWinnerRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RegionWinnerRow>(
            r#"
            SELECT region_nomi AS region, COUNT(*) AS count
            FROM winners
            GROUP BY region_nomi
            ORDER BY count DESC, region_nomi
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DistrictWinnerRow {
    pub region: CompactString,
    pub district: CompactString,
    pub count: i64,
}

#[derive(Debug, Clone)]
/// Districts with the most winners.
pub struct TopWinnerDistricts {
    pub limit: i64,
}

impl Processor<TopWinnerDistricts> for DatabaseProcessor {
    type Output = Vec<DistrictWinnerRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:TopWinnerDistricts")]
    async fn process(&self, query: TopWinnerDistricts) -> Result<Vec<DistrictWinnerRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, DistrictWinnerRow>(
            r#"
            SELECT region_nomi AS region, district_nomi AS district, COUNT(*) AS count
            FROM winners
            GROUP BY region_nomi, district_nomi
            ORDER BY count DESC, region_nomi, district_nomi
            LIMIT $1
            "#,
        )
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
