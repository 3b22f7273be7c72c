use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub district_id: Uuid,
    pub fio: CompactString,
    pub telefon: Option<CompactString>,
    pub manzil: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
/// Pick one eligible participant of a district uniformly at random.
pub struct SampleEligibleParticipant {
    pub district_id: Uuid,
    pub excluded: Vec<Uuid>,
}

impl Processor<SampleEligibleParticipant> for DatabaseProcessor {
    type Output = Option<Participant>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SampleEligibleParticipant")]
    async fn process(
        &self,
        query: SampleEligibleParticipant,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT p.id, p.district_id, p.fio, p.telefon, p.manzil, p.is_active
            FROM participants p
            JOIN districts d ON d.id = p.district_id AND d.is_active
            JOIN regions r ON r.id = d.region_id AND r.is_active
            WHERE p.district_id = $1
              AND p.is_active
              AND NOT (p.id = ANY($2))
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .bind(query.district_id)
        .bind(query.excluded)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }
}
