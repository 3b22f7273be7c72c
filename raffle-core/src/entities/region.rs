use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Region {
    pub id: Uuid,
    pub nomi: CompactString,
    pub soato: Option<CompactString>,
    pub is_active: bool,
}

/// An active region together with its eligible participant count.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RegionEligibleCount {
    pub id: Uuid,
    pub nomi: CompactString,
    pub soato: Option<CompactString>,
    pub eligible: i64,
}

#[derive(Debug, Clone)]
/// Count eligible participants per region.
///
/// A participant is eligible when it, its district and its region are all
/// active and its id is not in `excluded`. Regions without eligible
/// participants are omitted.
pub struct CountEligibleByRegion {
    pub excluded: Vec<Uuid>,
}

impl Processor<CountEligibleByRegion> for DatabaseProcessor {
    type Output = Vec<RegionEligibleCount>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountEligibleByRegion")]
    async fn process(
        &self,
        query: CountEligibleByRegion,
    ) -> Result<Vec<RegionEligibleCount>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RegionEligibleCount>(
            r#"
            SELECT r.id, r.nomi, r.soato, COUNT(p.id) AS eligible
            FROM regions r
            JOIN districts d ON d.region_id = r.id AND d.is_active
            JOIN participants p ON p.district_id = d.id AND p.is_active
            WHERE r.is_active
              AND NOT (p.id = ANY($1))
            GROUP BY r.id, r.nomi, r.soato
            ORDER BY r.nomi
            "#,
        )
        .bind(query.excluded)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// An active region together with its active district count.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RegionActiveDistricts {
    pub id: Uuid,
    pub nomi: CompactString,
    pub active_districts: i64,
}

#[derive(Debug, Clone)]
/// Active district count of every active region, sorted by name.
pub struct ListActiveDistrictCounts;

impl Processor<ListActiveDistrictCounts> for DatabaseProcessor {
    type Output = Vec<RegionActiveDistricts>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListActiveDistrictCounts")]
    async fn process(
        &self,
        _query: ListActiveDistrictCounts,
    ) -> Result<Vec<RegionActiveDistricts>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RegionActiveDistricts>(
            r#"
            SELECT r.id, r.nomi, COUNT(d.id) AS active_districts
            FROM regions r
            LEFT JOIN districts d ON d.region_id = r.id AND d.is_active
            WHERE r.is_active
            GROUP BY r.id, r.nomi
            ORDER BY r.nomi
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Population counts behind the selection statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct PopulationCounts {
    pub active_regions: i64,
    pub active_districts: i64,
    pub active_participants: i64,
    pub eligible_participants: i64,
    pub winners: i64,
}

#[derive(Debug, Clone)]
/// Count active regions, districts and participants in one round trip.
///
/// The counts are flat, the way an operator reads them: a participant is
/// "active" by its own flag alone. `eligible_participants` further drops
/// every id in `excluded`.
pub struct CountPopulation {
    pub excluded: Vec<Uuid>,
}

impl Processor<CountPopulation> for DatabaseProcessor {
    type Output = PopulationCounts;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountPopulation")]
    async fn process(&self, query: CountPopulation) -> Result<PopulationCounts, sqlx::Error> {
        let counts = sqlx::query_as::<_, PopulationCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM regions WHERE is_active) AS active_regions,
                (SELECT COUNT(*) FROM districts WHERE is_active) AS active_districts,
                (SELECT COUNT(*) FROM participants WHERE is_active) AS active_participants,
                (SELECT COUNT(*) FROM participants
                    WHERE is_active AND NOT (id = ANY($1))) AS eligible_participants,
                (SELECT COUNT(*) FROM winners) AS winners
            "#,
        )
        .bind(query.excluded)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }
}
