use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct District {
    pub id: Uuid,
    pub region_id: Uuid,
    pub nomi: CompactString,
    pub soato: Option<CompactString>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DistrictEligibleCount {
    pub id: Uuid,
    pub nomi: CompactString,
    pub soato: Option<CompactString>,
    pub eligible: i64,
}

#[derive(Debug, Clone)]
/// Count eligible participants per district of one region.
///
/// Same predicate as [`super::region::CountEligibleByRegion`]; an inactive
/// region yields no rows.
pub struct CountEligibleByDistrict {
    pub region_id: Uuid,
    pub excluded: Vec<Uuid>,
}

impl Processor<CountEligibleByDistrict> for DatabaseProcessor {
    type Output = Vec<DistrictEligibleCount>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountEligibleByDistrict")]
    async fn process(
        &self,
        query: CountEligibleByDistrict,
    ) -> Result<Vec<DistrictEligibleCount>, sqlx::Error> {
        let rows = sqlx::query_as::<_, DistrictEligibleCount>(
            r#"
            SELECT d.id, d.nomi, d.soato, COUNT(p.id) AS eligible
            FROM districts d
            JOIN regions r ON r.id = d.region_id AND r.is_active
            JOIN participants p ON p.district_id = d.id AND p.is_active
            WHERE d.region_id = $1
              AND d.is_active
              AND NOT (p.id = ANY($2))
            GROUP BY d.id, d.nomi, d.soato
            ORDER BY d.nomi
            "#,
        )
        .bind(query.region_id)
        .bind(query.excluded)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
