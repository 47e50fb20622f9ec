//! GTSRB class labels
//!
//! The order matches the class indices the network was trained with. The
//! model output is interpreted positionally against this list.

/// Number of traffic-sign classes the model distinguishes.
pub const NUM_CLASSES: usize = 43;

/// Class labels in model output order.
pub const GTSRB_LABELS: [&str; NUM_CLASSES] = [
    "Ahead only",
    "Beware of ice/snow",
    "Bicycles crossing",
    "Bumpy road",
    "Children crossing",
    "Dangerous curve to the left",
    "Dangerous curve to the right",
    "Double curve",
    "End of all speed and passing limits",
    "End of no passing",
    "End of no passing by vehicles over 3.5 metric tons",
    "End of speed limit (80km/h)",
    "General caution",
    "Go straight or left",
    "Go straight or right",
    "Keep left",
    "Keep right",
    "No entry",
    "No passing",
    "No passing for vehicles over 3.5 metric tons",
    "No vehicles",
    "Pedestrians",
    "Priority road",
    "Right-of-way at the next intersection",
    "Road narrows on the right",
    "Road work",
    "Roundabout mandatory",
    "Slippery road",
    "Speed limit (100km/h)",
    "Speed limit (120km/h)",
    "Speed limit (20km/h)",
    "Speed limit (30km/h)",
    "Speed limit (50km/h)",
    "Speed limit (60km/h)",
    "Speed limit (70km/h)",
    "Speed limit (80km/h)",
    "Stop",
    "Traffic signals",
    "Turn left ahead",
    "Turn right ahead",
    "Vehicles over 3.5 metric tons prohibited",
    "Wild animals crossing",
    "Yield",
];

/// Owned copy of the label list, as held by a predictor.
pub fn default_labels() -> Vec<String> {
    GTSRB_LABELS.iter().map(|l| l.to_string()).collect()
}

/// Whether `label` is one of the known class labels.
pub fn is_known_label(label: &str) -> bool {
    GTSRB_LABELS.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_labels_are_unique() {
        let unique: HashSet<&str> = GTSRB_LABELS.iter().copied().collect();
        assert_eq!(unique.len(), NUM_CLASSES);
    }

    #[test]
    fn test_label_order() {
        assert_eq!(GTSRB_LABELS[0], "Ahead only");
        assert_eq!(GTSRB_LABELS[36], "Stop");
        assert_eq!(GTSRB_LABELS[NUM_CLASSES - 1], "Yield");
    }

    #[test]
    fn test_known_label() {
        assert!(is_known_label("Priority road"));
        assert!(!is_known_label("wrong"));
        assert_eq!(default_labels().len(), NUM_CLASSES);
    }
}
