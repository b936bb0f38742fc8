use std::collections::HashMap;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

use crate::config::IMG_FILE_EXT;

/// Source of wall-clock time for file names.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// `year_month_day_hour_minute_second`, fields not zero-padded.
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    format!(
        "{}_{}_{}_{}_{}_{}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// Hands out `<prefix>_<timestamp>.jpg` names.
///
/// The timestamp only has second resolution, so a repeat of the same prefix
/// within the same second gets a `-<n>` suffix. Asking again after a
/// candidate turned out to be taken moves the counter on.
pub struct Namer {
    clock: Box<dyn Clock>,
    // prefix -> (last stamp, repeats within it)
    issued: HashMap<String, (String, u32)>,
}

impl Namer {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            issued: HashMap::new(),
        }
    }

    pub fn timestamp(&self) -> String {
        format_timestamp(&self.clock.now())
    }

    pub fn next_name(&mut self, prefix: &str) -> String {
        let stamp = self.timestamp();
        let (last_stamp, repeat) = self
            .issued
            .entry(prefix.to_string())
            .or_insert_with(|| (String::new(), 0));
        if *last_stamp == stamp {
            *repeat += 1;
        } else {
            *last_stamp = stamp;
            *repeat = 0;
        }
        if *repeat == 0 {
            format!("{prefix}_{last_stamp}{IMG_FILE_EXT}")
        } else {
            format!("{prefix}_{last_stamp}-{repeat}{IMG_FILE_EXT}")
        }
    }
}

impl Default for Namer {
    fn default() -> Self {
        Self::new(Box::new(LocalClock))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use super::*;

    #[derive(Clone)]
    struct FixedClock(Arc<Mutex<NaiveDateTime>>);

    impl FixedClock {
        fn at(h: u32, m: u32, s: u32) -> Self {
            let time = NaiveDate::from_ymd_opt(2024, 3, 7)
                .and_then(|date| date.and_hms_opt(h, m, s))
                .unwrap();
            Self(Arc::new(Mutex::new(time)))
        }

        fn set(&self, h: u32, m: u32, s: u32) {
            let mut guard = self.0.lock().unwrap();
            *guard = guard.date().and_hms_opt(h, m, s).unwrap();
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn timestamp_is_not_zero_padded() {
        let clock = FixedClock::at(9, 5, 3);
        assert_eq!(format_timestamp(&clock.now()), "2024_3_7_9_5_3");
    }

    #[test]
    fn same_second_names_do_not_collide() {
        let clock = FixedClock::at(14, 2, 9);
        let mut namer = Namer::new(Box::new(clock.clone()));

        let first = namer.next_name("src_img");
        let second = namer.next_name("src_img");
        assert_eq!(first, "src_img_2024_3_7_14_2_9.jpg");
        assert_eq!(second, "src_img_2024_3_7_14_2_9-1.jpg");

        // other prefixes count on their own
        assert_eq!(
            namer.next_name("result_img"),
            "result_img_2024_3_7_14_2_9.jpg"
        );

        clock.set(14, 2, 10);
        assert_eq!(
            namer.next_name("src_img"),
            "src_img_2024_3_7_14_2_10.jpg"
        );
    }
}
