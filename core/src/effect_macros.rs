//! Declarative macros for effect construction

/// Create an `Effect::EventStore` with an `AppendEvents` operation
///
/// # Example
///
/// ```rust,ignore
/// use flightdeck_core::append_events;
///
/// append_events! {
///     store: env.event_store,
///     stream: env.stream_id.clone(),
///     expected_version: None,
///     events: serialized,
///     on_success: |_version| None,
///     on_error: |error| Some(Action::AppendFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! append_events {
    (
        store: $store:expr,
        stream: $stream:expr,
        expected_version: $expected:expr,
        events: $events:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::EventStore(
            $crate::effect::EventStoreOperation::AppendEvents {
                event_store: ::std::sync::Arc::clone(&$store),
                stream_id: $crate::stream::StreamId::from($stream),
                expected_version: $expected,
                events: $events,
                on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
                on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
            }
        )
    };
}
