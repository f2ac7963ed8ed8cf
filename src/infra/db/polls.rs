use async_trait::async_trait;

use crate::{
    application::repos::{PollsRepo, RepoError},
    domain::polls::{DeleteOutcome, DeleteToken, PollId, SchedulingPoll},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PollRow {
    id: String,
    title: String,
    delete_token: String,
}

impl TryFrom<PollRow> for SchedulingPoll {
    type Error = RepoError;

    fn try_from(row: PollRow) -> Result<Self, Self::Error> {
        let id = PollId::parse(&row.id)
            .map_err(|err| RepoError::malformed(format!("poll id: {err}")))?;
        let delete_token = DeleteToken::parse(&row.delete_token)
            .map_err(|_| RepoError::malformed(format!("poll `{id}` has no delete token")))?;

        Ok(Self {
            id,
            title: row.title,
            delete_token,
        })
    }
}

#[async_trait]
impl PollsRepo for PostgresRepositories {
    async fn find_poll(&self, id: &PollId) -> Result<Option<SchedulingPoll>, RepoError> {
        let row = sqlx::query_as::<_, PollRow>(
            "SELECT id, title, delete_token FROM polls WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(SchedulingPoll::try_from).transpose()
    }

    async fn delete_poll(&self, id: &PollId) -> Result<DeleteOutcome, RepoError> {
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(if result.rows_affected() == 0 {
            DeleteOutcome::AlreadyGone
        } else {
            DeleteOutcome::Deleted
        })
    }
}
