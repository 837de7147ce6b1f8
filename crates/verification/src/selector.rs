//! Picking up a pending task from the opening scan.

use floorscan_core::{Mode, ScanError, ScanResult, codes_match};
use floorscan_scan::ScanInput;

use crate::flow::MatchedBy;
use crate::task::Task;

pub struct TaskSelector;

impl TaskSelector {
    /// Find the task the scan refers to.
    ///
    /// Product codes win over bin labels; ties go to list order. Only pending tasks of
    /// `mode` are candidates.
    pub fn select<'a>(
        mode: Mode,
        scan: &ScanInput,
        tasks: impl IntoIterator<Item = &'a Task>,
    ) -> ScanResult<(Task, MatchedBy)> {
        let candidates: Vec<&Task> = tasks
            .into_iter()
            .filter(|t| t.is_pending() && t.mode() == mode)
            .collect();

        if let Some(task) = candidates.iter().find(|t| scan.matches_product(&t.product_code)) {
            return Ok(((*task).clone(), MatchedBy::Product));
        }
        if let Some(task) = candidates
            .iter()
            .find(|t| codes_match(&scan.raw, &t.target_location))
        {
            return Ok(((*task).clone(), MatchedBy::Location));
        }
        Err(ScanError::not_found(format!(
            "no pending {mode} task for {}",
            scan.raw
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn test_tasks() -> Vec<Task> {
        vec![
            Task::pick("A-01", "SKU1", 5, vec![]),
            Task::pick("B-02", "A-01", 1, vec![]),
            Task::pick("C-03", "SKU3", 2, vec![]),
        ]
    }

    #[test]
    fn product_match_beats_location_match() {
        let tasks = test_tasks();
        let (task, matched) =
            TaskSelector::select(Mode::Pick, &ScanInput::manual("a-01"), &tasks).unwrap();
        assert_eq!(task.target_location, "B-02");
        assert_eq!(matched, MatchedBy::Product);
    }

    #[test]
    fn location_match_starts_at_item() {
        let tasks = test_tasks();
        let (task, matched) =
            TaskSelector::select(Mode::Pick, &ScanInput::manual("c-03"), &tasks).unwrap();
        assert_eq!(task.product_code, "SKU3");
        assert_eq!(matched, MatchedBy::Location);
    }

    #[test]
    fn non_pending_and_other_mode_tasks_are_ignored() {
        let mut tasks = test_tasks();
        tasks[2].status = TaskStatus::InProgress;
        tasks.push(Task::count("D-04", "SKU3", 9));

        let err = TaskSelector::select(Mode::Pick, &ScanInput::manual("SKU3"), &tasks).unwrap_err();
        match err {
            ScanError::NotFound(msg) if msg.contains("SKU3") => {}
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }
}
