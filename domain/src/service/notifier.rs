use crate::model::entity::Job;
use crate::model::vo::{MailEvent, MailPolicy};

#[async_trait::async_trait]
pub trait Notifier {
    async fn notify(&self, policy: &MailPolicy, event: MailEvent, job: &Job) -> anyhow::Result<()>;
}
