//! Mock implementations of the kernel's extension traits.

use knock_core::{CoreError, Effect, NodeEvent, NodeEventHandler, Rule, RuleContext, RuleId, Trigger};
use mockall::mock;

// Generate the mock implementation for Rule.
// `watches` and `writes` keep their default (empty) implementations.
mock! {
    pub Rule {}

    impl Rule for Rule {
        fn id(&self) -> &RuleId;
        fn priority(&self) -> i32;
        fn accepts(&self, trigger: &Trigger) -> bool;
        fn evaluate<'a>(&self, ctx: &RuleContext<'a>) -> Result<Option<Vec<Effect>>, CoreError>;
    }
}

// Generate the mock implementation for NodeEventHandler
mock! {
    pub EventHandler {}

    impl NodeEventHandler for EventHandler {
        fn handle_event(&self, event: Box<dyn NodeEvent>);
    }
}

/// Creates a mock rule with the given ID that reacts to `initialize` and never fires.
pub fn create_mock_rule(id: &str) -> MockRule {
    let mut mock = MockRule::new();

    mock.expect_id().return_const(RuleId::from(id));
    mock.expect_priority().return_const(0);
    mock.expect_accepts()
        .returning(|trigger| matches!(trigger, Trigger::Initialize { .. }));

    mock
}

/// Creates a mock event handler that accepts any event.
pub fn create_mock_event_handler() -> MockEventHandler {
    let mut mock = MockEventHandler::new();
    mock.expect_handle_event().returning(|_| ());
    mock
}
