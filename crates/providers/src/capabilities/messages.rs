use std::sync::Arc;

use async_trait::async_trait;
use smsbridge_core_types::{BridgeError, MethodCall, Payload, PermissionRight, Reply};
use smsbridge_record_query::{query_rows, MessageBox, QuerySpec};
use tracing::debug;

use crate::device::ContentResolver;
use crate::facade::Capability;

/// `getInbox` / `getSent` / `getDraft`.
pub struct Messages {
    resolver: Arc<dyn ContentResolver>,
}

impl Messages {
    pub fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Capability for Messages {
    type Request = QuerySpec;

    const NAME: &'static str = "messages";
    const RIGHTS: &'static [PermissionRight] = &[PermissionRight::ReadSms];

    fn handles(&self, action: &str) -> bool {
        MessageBox::from_action(action).is_some()
    }

    fn parse(&self, call: &MethodCall) -> Result<QuerySpec, BridgeError> {
        let source = MessageBox::from_action(&call.method)
            .ok_or_else(|| BridgeError::NotImplemented(call.method.clone()))?;
        QuerySpec::from_arguments(source, &call.arguments)
    }

    async fn execute(&self, spec: QuerySpec) -> Reply {
        let Some(rows) = self.resolver.query(spec.source.uri(), None).await? else {
            return Err(BridgeError::PermissionDenied("permission denied".into()));
        };
        let page = query_rows(rows, &spec);
        debug!(
            target = "providers",
            source = spec.source.uri(),
            returned = page.len(),
            "message query complete"
        );
        Ok(Payload::Value(serde_json::to_value(page)?))
    }
}
