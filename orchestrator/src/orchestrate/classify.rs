//! S2 Classify (spec.md §4.9): runs C7 over the query plus the image flag.

use intent::{IntentClassifier, IntentResult};

pub fn classify(classifier: &IntentClassifier, query: &str, has_image_attachment: bool) -> IntentResult {
    classifier.classify(query, has_image_attachment)
}
