use uuid::Uuid;

/// One inbound slash-command request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: String,
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub request_id: String,
}

impl CommandInvocation {
    pub fn new(
        command: impl Into<String>,
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Slack mention markup for the invoking user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }

    pub fn notify(&self, text: impl Into<String>) -> OutboundNotification {
        OutboundNotification { channel_id: self.channel_id.clone(), text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundNotification {
    pub channel_id: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::CommandInvocation;

    #[test]
    fn invocations_get_distinct_request_ids() {
        let first = CommandInvocation::new("/hello", "C1", "U1", "");
        let second = CommandInvocation::new("/hello", "C1", "U1", "");
        assert_ne!(first.request_id, second.request_id);
    }

    #[test]
    fn notification_targets_originating_channel() {
        let invocation = CommandInvocation::new("/gemini", "C42", "U7", "why");
        let notification = invocation.notify(format!("{} hi", invocation.mention()));
        assert_eq!(notification.channel_id, "C42");
        assert_eq!(notification.text, "<@U7> hi");
    }
}
