use std::collections::BTreeSet;

use crate::{SlotError, SlotTime};

/// Every time point `start, start + duration, ...` strictly before `end`.
///
/// An inverted or empty range yields no points.
pub fn slot_grid(
    start_time: SlotTime,
    end_time: SlotTime,
    slot_duration: i64,
) -> Result<Vec<SlotTime>, SlotError> {
    if slot_duration <= 0 {
        return Err(SlotError::InvalidConfiguration(format!(
            "Slot duration must be greater than zero, got {}",
            slot_duration
        )));
    }

    let step = u32::try_from(slot_duration).unwrap_or(u32::MAX);
    let end = end_time.minutes_since_midnight();
    let mut grid = Vec::new();
    let mut cursor = start_time.minutes_since_midnight();

    while cursor < end {
        match SlotTime::from_minutes(cursor) {
            Some(time) => grid.push(time),
            None => break,
        }
        cursor = match cursor.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(grid)
}

/// The slot grid minus `booked_slots`, in time order.
pub fn generate_slots(
    start_time: SlotTime,
    end_time: SlotTime,
    slot_duration: i64,
    booked_slots: &BTreeSet<SlotTime>,
) -> Result<Vec<SlotTime>, SlotError> {
    Ok(slot_grid(start_time, end_time, slot_duration)?
        .into_iter()
        .filter(|time| !booked_slots.contains(time))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> SlotTime {
        raw.parse().unwrap()
    }

    #[test]
    fn grid_excludes_end_time() {
        let grid = slot_grid(t("09:00"), t("10:00"), 30).unwrap();
        assert_eq!(grid, vec![t("09:00"), t("09:30")]);
    }

    #[test]
    fn partial_final_step_is_kept() {
        let grid = slot_grid(t("09:00"), t("09:50"), 20).unwrap();
        assert_eq!(grid, vec![t("09:00"), t("09:20"), t("09:40")]);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(slot_grid(t("10:00"), t("09:00"), 15).unwrap().is_empty());
        assert!(slot_grid(t("10:00"), t("10:00"), 15).unwrap().is_empty());
    }
}
