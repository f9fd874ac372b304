/// Tracks how long a condition has been true within the current bucket.
///
/// Timestamps are elapsed-time nanoseconds and must be passed in
/// non-decreasing order. The timer has no internal locking; callers that
/// share one across threads must serialize access themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTimer {
    condition: bool,
    timer_ns: i64,
    last_condition_true_timestamp_ns: i64,
}

impl ConditionTimer {
    /// Starts a timer at the beginning of a bucket.
    pub fn new(initial_condition: bool, bucket_start_ns: i64) -> Self {
        Self {
            condition: initial_condition,
            timer_ns: 0,
            last_condition_true_timestamp_ns: if initial_condition {
                bucket_start_ns
            } else {
                0
            },
        }
    }

    /// Records a condition change at `timestamp_ns`. Repeated values are ignored.
    pub fn on_condition_changed(&mut self, new_condition: bool, timestamp_ns: i64) {
        if new_condition == self.condition {
            return;
        }
        self.condition = new_condition;
        if new_condition {
            self.last_condition_true_timestamp_ns = timestamp_ns;
        } else {
            self.timer_ns += timestamp_ns - self.last_condition_true_timestamp_ns;
        }
    }

    /// Closes the current bucket and returns its accumulated true duration.
    ///
    /// A condition that is still true is carried into the next bucket from
    /// `next_bucket_start_ns`.
    pub fn new_bucket_start(&mut self, next_bucket_start_ns: i64) -> i64 {
        if self.condition {
            self.timer_ns += next_bucket_start_ns - self.last_condition_true_timestamp_ns;
            self.last_condition_true_timestamp_ns = next_bucket_start_ns;
        }
        std::mem::take(&mut self.timer_ns)
    }

    pub fn condition(&self) -> bool {
        self.condition
    }

    /// True duration accumulated so far in the current bucket, excluding any
    /// interval that is still open.
    pub fn timer_ns(&self) -> i64 {
        self.timer_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CT_START_TIME_NS: i64 = 1_000;

    #[test]
    fn test_timer_init_true() {
        let mut timer = ConditionTimer::new(true, CT_START_TIME_NS);
        assert!(timer.condition());
        assert_eq!(timer.timer_ns(), 0);

        assert_eq!(timer.new_bucket_start(CT_START_TIME_NS + 100), 100);
        assert_eq!(timer.timer_ns(), 0);
    }

    #[test]
    fn test_timer_init_false() {
        let mut timer = ConditionTimer::new(false, CT_START_TIME_NS);
        assert!(!timer.condition());
        assert_eq!(timer.new_bucket_start(CT_START_TIME_NS + 100), 0);
    }

    #[test]
    fn test_bucket_accounting() {
        let mut timer = ConditionTimer::new(true, 10);
        assert_eq!(timer.new_bucket_start(200), 190);

        timer.on_condition_changed(false, 205);
        assert_eq!(timer.timer_ns(), 5);
        assert!(!timer.condition());

        assert_eq!(timer.new_bucket_start(300), 5);
        assert_eq!(timer.timer_ns(), 0);
    }

    #[test]
    fn test_repeated_condition_is_ignored() {
        let mut timer = ConditionTimer::new(false, 0);
        timer.on_condition_changed(true, 10);
        timer.on_condition_changed(true, 50);
        timer.on_condition_changed(false, 70);
        timer.on_condition_changed(false, 90);
        assert_eq!(timer.timer_ns(), 60);
    }

    #[test]
    fn test_multiple_intervals_in_bucket() {
        let mut timer = ConditionTimer::new(false, 0);
        timer.on_condition_changed(true, 10);
        timer.on_condition_changed(false, 20);
        timer.on_condition_changed(true, 40);
        timer.on_condition_changed(false, 45);
        timer.on_condition_changed(true, 90);

        assert_eq!(timer.new_bucket_start(100), 25);
        // Still true: the next bucket starts counting from 100.
        timer.on_condition_changed(false, 130);
        assert_eq!(timer.new_bucket_start(200), 30);
        assert_eq!(timer.new_bucket_start(300), 0);
    }
}
