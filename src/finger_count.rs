use crate::landmarks::{HandLandmark, HandObservation, Handedness};

// (tip, pip) for the four fingers that bend vertically
const FINGERS: [(HandLandmark, HandLandmark); 4] = [
    (HandLandmark::IndexTip, HandLandmark::IndexPip),
    (HandLandmark::MiddleTip, HandLandmark::MiddlePip),
    (HandLandmark::RingTip, HandLandmark::RingPip),
    (HandLandmark::PinkyTip, HandLandmark::PinkyPip),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandFingerCount {
    pub index: usize,
    pub handedness: Handedness,
    pub count: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerCountResult {
    pub total: u32,
    pub hands: Vec<HandFingerCount>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FingerCounter;

impl FingerCounter {
    pub fn new() -> Self {
        FingerCounter
    }

    /// A finger is up when its tip sits above its middle joint (y grows downward).
    pub fn is_finger_up(&self, hand: &HandObservation, tip: HandLandmark, pip: HandLandmark) -> bool {
        hand.get_point(tip).y < hand.get_point(pip).y
    }

    /// The thumb moves sideways, so compare x of the tip against the
    /// interphalangeal joint; which side counts as extended depends on the hand.
    pub fn is_thumb_up(&self, hand: &HandObservation) -> bool {
        let tip = hand.get_point(HandLandmark::ThumbTip);
        let ip = hand.get_point(HandLandmark::ThumbIp);

        match hand.handedness {
            Handedness::Right => tip.x > ip.x,
            Handedness::Left => tip.x < ip.x,
        }
    }

    pub fn count_fingers(&self, hand: &HandObservation) -> u8 {
        let thumb = self.is_thumb_up(hand) as u8;

        let fingers = FINGERS
            .iter()
            .filter(|(tip, pip)| self.is_finger_up(hand, *tip, *pip))
            .count() as u8;

        thumb + fingers
    }

    pub fn count_all_hands(&self, hands: &[HandObservation]) -> FingerCountResult {
        let hands: Vec<HandFingerCount> = hands
            .iter()
            .enumerate()
            .map(|(index, hand)| HandFingerCount {
                index,
                handedness: hand.handedness,
                count: self.count_fingers(hand),
            })
            .collect();

        FingerCountResult {
            total: hands.iter().map(|h| h.count as u32).sum(),
            hands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::tests::{fist, open_hand};
    use crate::landmarks::Landmark;

    #[test]
    fn open_hand_counts_five() {
        let counter = FingerCounter::new();
        assert_eq!(counter.count_fingers(&open_hand(Handedness::Right)), 5);
        assert_eq!(counter.count_fingers(&open_hand(Handedness::Left)), 5);
    }

    #[test]
    fn fist_counts_zero() {
        let counter = FingerCounter::new();
        assert_eq!(counter.count_fingers(&fist(Handedness::Right)), 0);
        assert_eq!(counter.count_fingers(&fist(Handedness::Left)), 0);
    }

    #[test]
    fn thumb_direction_flips_with_handedness() {
        let counter = FingerCounter::new();
        // a right-hand pose reported as a left hand has its thumb on the folded side
        let mut hand = open_hand(Handedness::Right);
        hand.handedness = Handedness::Left;
        assert!(!counter.is_thumb_up(&hand));
        assert_eq!(counter.count_fingers(&hand), 4);
    }

    #[test]
    fn tip_level_with_joint_is_down() {
        let counter = FingerCounter::new();
        let mut hand = fist(Handedness::Right);
        hand.points[8] = Landmark::new(0.42, 0.5, 0.0);
        assert!(!counter.is_finger_up(&hand, HandLandmark::IndexTip, HandLandmark::IndexPip));
        hand.points[8] = Landmark::new(0.42, 0.49, 0.0);
        assert!(counter.is_finger_up(&hand, HandLandmark::IndexTip, HandLandmark::IndexPip));
        assert_eq!(counter.count_fingers(&hand), 1);
    }

    #[test]
    fn counts_every_hand_in_frame() {
        let counter = FingerCounter::new();
        let mut peace = fist(Handedness::Left);
        peace.points[8] = Landmark::new(0.42, 0.3, 0.0);
        peace.points[12] = Landmark::new(0.48, 0.3, 0.0);

        let result = counter.count_all_hands(&[open_hand(Handedness::Right), peace]);

        assert_eq!(result.total, 7);
        assert_eq!(
            result.hands,
            vec![
                HandFingerCount { index: 0, handedness: Handedness::Right, count: 5 },
                HandFingerCount { index: 1, handedness: Handedness::Left, count: 2 },
            ]
        );
    }

    #[test]
    fn no_hands_is_an_empty_result() {
        let result = FingerCounter::new().count_all_hands(&[]);
        assert_eq!(result, FingerCountResult::default());
    }
}
