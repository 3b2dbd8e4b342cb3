use proptest::prelude::*;
use sdk::errors::{EngineError, ErrorExt};
use sdk::types::{Message, MessageIdGenerator, MessageRole};

// Hints are static, so nothing the caller puts into an error leaks into them.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Credential(error_str.clone()),
            EngineError::KeyringError(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            if error_str.len() > 12 {
                prop_assert!(!hint.contains(&error_str));
            }
        }
    }
}

// Ids keep increasing no matter how many messages are created.
proptest! {
    #[test]
    fn test_message_ids_strictly_increase(count in 1usize..200) {
        let ids = MessageIdGenerator::new();
        let mut last = None;
        for i in 0..count {
            let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
            let msg = Message::new(ids.next_id(), role, format!("turn {}", i));
            if let Some(prev) = last {
                prop_assert!(msg.id() > prev);
            }
            last = Some(msg.id());
        }
    }

    #[test]
    fn test_message_text_is_preserved(text in "\\PC*") {
        let ids = MessageIdGenerator::new();
        let msg = Message::user(ids.next_id(), text.clone());
        prop_assert_eq!(msg.text(), text.as_str());
    }
}
