//! Exchange, routing key and queue bindings.

/// Queue bound to the exchange with a topic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Queue name.
    pub queue: String,
    /// Routing-key pattern; `*` matches one word, `#` zero or more.
    pub pattern: String,
}

/// Names shared by the producer and the broker.
///
/// Both sides must agree on these for messages to arrive anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusTopology {
    /// Topic exchange name.
    pub exchange: String,
    /// Routing key used for all mutation traffic.
    pub routing_key: String,
    /// Queue reserved for replay/backfill; currently drained and ignored.
    pub register_queue: String,
    /// Queue consumed by the notification router.
    pub notify_queue: String,
}

impl Default for BusTopology {
    fn default() -> Self {
        Self {
            exchange: "workflow-manager-mutations".to_string(),
            routing_key: "workflow.entities.mutations".to_string(),
            register_queue: "workflow-manager-event-register".to_string(),
            notify_queue: "workflow-manager-event-notify".to_string(),
        }
    }
}

impl BusTopology {
    /// Both queues, bound with the mutation routing key.
    #[must_use]
    pub fn bindings(&self) -> Vec<Binding> {
        vec![
            Binding {
                queue: self.register_queue.clone(),
                pattern: self.routing_key.clone(),
            },
            Binding {
                queue: self.notify_queue.clone(),
                pattern: self.routing_key.clone(),
            },
        ]
    }

    /// Queues a message published under `routing_key` is copied into.
    #[must_use]
    pub fn queues_for(&self, routing_key: &str) -> Vec<String> {
        self.bindings()
            .into_iter()
            .filter(|binding| topic_matches(&binding.pattern, routing_key))
            .map(|binding| binding.queue)
            .collect()
    }

    /// Returns `true` if `queue` is one of the declared queues.
    #[must_use]
    pub fn declares(&self, queue: &str) -> bool {
        queue == self.register_queue || queue == self.notify_queue
    }
}

/// Topic-exchange pattern match over `.`-separated words.
#[must_use]
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => {
            (0..=key.len()).any(|skip| matches_words(rest, key.get(skip..).unwrap_or_default()))
        }
        Some((&word, rest)) => match key.split_first() {
            Some((&head, tail)) if word == "*" || word == head => matches_words(rest, tail),
            _ => false,
        },
    }
}
