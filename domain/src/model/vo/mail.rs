use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Deserialize;

use super::DescriptorError;

/// Job events a notification can be sent for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(try_from = "String")]
pub enum MailEvent {
    Begin,
    End,
    Fail,
    Requeue,
    All,
}

impl TryFrom<String> for MailEvent {
    type Error = DescriptorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MailEvent::from_str(value.trim()).map_err(|_| DescriptorError::UnknownMailEvent(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailPolicy {
    pub mail_type: BTreeSet<MailEvent>,
    pub mail_user: String,
}

impl MailPolicy {
    pub fn new(
        events: impl IntoIterator<Item = MailEvent>,
        user: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        let policy = Self {
            mail_type: events.into_iter().collect(),
            mail_user: user.into(),
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        if !self.mail_type.is_empty() && self.mail_user.trim().is_empty() {
            return Err(DescriptorError::EmptyMailUser);
        }
        Ok(())
    }

    /// No events selected, so nothing is ever sent.
    pub fn is_empty(&self) -> bool {
        self.mail_type.is_empty()
    }

    pub fn wants(&self, event: MailEvent) -> bool {
        self.mail_type.contains(&event) || self.mail_type.contains(&MailEvent::All)
    }

    /// Comma separated event list, e.g. `END,FAIL`.
    pub fn mail_type_value(&self) -> String {
        self.mail_type.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_events() {
        assert_eq!("end".parse::<MailEvent>().unwrap(), MailEvent::End);
        assert_eq!("FAIL".parse::<MailEvent>().unwrap(), MailEvent::Fail);
        assert_eq!(
            MailEvent::try_from("STAGE".to_owned()),
            Err(DescriptorError::UnknownMailEvent("STAGE".to_owned()))
        );
    }

    #[test]
    fn wants_and_render() {
        let policy = MailPolicy::new([MailEvent::Fail, MailEvent::End], "md@example.org").unwrap();
        assert!(policy.wants(MailEvent::End));
        assert!(policy.wants(MailEvent::Fail));
        assert!(!policy.wants(MailEvent::Begin));
        assert_eq!(policy.mail_type_value(), "END,FAIL");

        let all = MailPolicy::new([MailEvent::All], "md@example.org").unwrap();
        assert!(all.wants(MailEvent::Begin));
    }

    #[test]
    fn empty_policy() {
        let policy = MailPolicy::new([], "").unwrap();
        assert!(policy.is_empty());
        assert!(!policy.wants(MailEvent::Fail));
    }

    #[test]
    fn needs_address() {
        assert_eq!(MailPolicy::new([MailEvent::End], " "), Err(DescriptorError::EmptyMailUser));
    }
}
