//! Tasks, subtasks, comments and the create-task request.
//!
//! The active/completed split is never stored: [`partition`] recomputes it
//! from `is_completed` every time a view is built.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{null_as_empty, EntityId};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Task category. Unknown values decode to [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Work,
    Personal,
    Workout,
    Study,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Workout,
        Category::Study,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Workout => "Workout",
            Category::Study => "Study",
            Category::Other => "Other",
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .unwrap_or_default()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Custom,
}

/// How a task repeats. `days_of_week` (0 = Sunday) is only meaningful for
/// [`RecurrenceKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
}

impl Recurrence {
    pub fn daily() -> Self {
        Self {
            kind: RecurrenceKind::Daily,
            days_of_week: None,
        }
    }

    pub fn weekly() -> Self {
        Self {
            kind: RecurrenceKind::Weekly,
            days_of_week: None,
        }
    }

    pub fn custom(days: impl IntoIterator<Item = u8>) -> Self {
        Self {
            kind: RecurrenceKind::Custom,
            days_of_week: Some(days.into_iter().collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub content: String,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    /// Owning user. The backend sends either a bare id or a populated user.
    #[serde(default, deserialize_with = "owner_reference")]
    pub user: Option<EntityId>,
    pub content: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtasks: Vec<Subtask>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub date: Option<String>,
}

impl Task {
    /// Number of subtasks still open.
    pub fn pending_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| !s.is_completed).count()
    }

    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reference {
    Id(String),
    Populated {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

fn owner_reference<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Reference>::deserialize(deserializer)?.map(|r| match r {
        Reference::Id(id) | Reference::Populated { id } => id,
    }))
}

/// Split tasks into `(active, completed)`, preserving their order.
pub fn partition(tasks: &[Task]) -> (Vec<&Task>, Vec<&Task>) {
    tasks.iter().partition(|t| !t.is_completed)
}

/// Aggregate completion of a task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|t| t.is_completed).count(),
            total: tasks.len(),
        }
    }

    /// Completion percentage in `0.0..=100.0`; zero for an empty collection.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// NewTask
// ---------------------------------------------------------------------------

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub content: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_shared: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl NewTask {
    pub fn new(content: impl Into<String>, category: Category) -> Self {
        Self {
            content: content.into(),
            category,
            date: None,
            is_shared: false,
            is_recurring: false,
            recurrence: None,
        }
    }

    /// A common goal: always categorised as `Other` and shared.
    pub fn shared_goal(content: impl Into<String>) -> Self {
        Self {
            is_shared: true,
            ..Self::new(content, Category::Other)
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn repeating(mut self, recurrence: Recurrence) -> Self {
        self.is_recurring = true;
        self.recurrence = Some(recurrence);
        self
    }

    /// Check the request before it is sent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.content.trim().is_empty() {
            return Err(CoreError::Validation("Task content must not be empty".into()));
        }
        if let Some(days) = self.recurrence.as_ref().and_then(|r| r.days_of_week.as_ref()) {
            if let Some(bad) = days.iter().find(|d| **d > 6) {
                return Err(CoreError::Validation(format!(
                    "Day of week {bad} is out of range (0-6)"
                )));
            }
        }
        if self.is_recurring && self.recurrence.is_none() {
            return Err(CoreError::Validation(
                "Recurring task is missing its recurrence".into(),
            ));
        }
        Ok(())
    }

    /// Trim the content and tidy the recurrence: custom days are sorted and
    /// de-duplicated, other kinds carry no day list.
    pub fn normalized(mut self) -> Self {
        self.content = self.content.trim().to_string();
        if let Some(rec) = self.recurrence.as_mut() {
            match rec.kind {
                RecurrenceKind::Custom => {
                    let days = rec.days_of_week.get_or_insert_with(Vec::new);
                    days.sort_unstable();
                    days.dedup();
                }
                RecurrenceKind::Daily | RecurrenceKind::Weekly => rec.days_of_week = None,
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, done: bool) -> Task {
        Task {
            id: id.to_string(),
            user: None,
            content: format!("task {id}"),
            category: Category::Work,
            is_completed: done,
            is_recurring: false,
            recurrence: None,
            subtasks: vec![],
            comments: vec![],
            is_shared: false,
            date: None,
        }
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        let c: Category = serde_json::from_str(r#""Gardening""#).unwrap();
        assert_eq!(c, Category::Other);
        let c: Category = serde_json::from_str(r#""Study""#).unwrap();
        assert_eq!(c, Category::Study);
        assert_eq!(serde_json::to_string(&Category::Workout).unwrap(), r#""Workout""#);
    }

    #[test]
    fn task_decodes_with_populated_owner_and_null_collections() {
        let json = r#"{
            "_id": "t1",
            "user": {"_id": "u1", "name": "Ada"},
            "content": "Read",
            "category": "Study",
            "isCompleted": true,
            "isRecurring": true,
            "recurrence": {"type": "custom", "daysOfWeek": [1, 3]},
            "subtasks": [{"_id": "s1", "content": "ch1", "isCompleted": false},
                         {"_id": "s2", "content": "ch2", "isCompleted": true}],
            "comments": null,
            "isShared": false,
            "date": "2024-06-01"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.user.as_deref(), Some("u1"));
        assert!(task.is_completed);
        assert_eq!(task.recurrence, Some(Recurrence::custom([1, 3])));
        assert_eq!(task.pending_subtasks(), 1);
        assert!(task.comments.is_empty());
    }

    #[test]
    fn task_decodes_with_bare_owner_id() {
        let json = r#"{"_id": "t1", "user": "u9", "content": "Run"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.user.as_deref(), Some("u9"));
        assert_eq!(task.category, Category::Other);
        assert!(!task.is_shared);
    }

    #[test]
    fn partition_preserves_order() {
        let tasks = vec![task("a", false), task("b", true), task("c", false)];
        let (active, completed) = partition(&tasks);
        let ids: Vec<_> = active.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "b");
    }

    #[test]
    fn progress_of_empty_collection_is_zero() {
        let p = Progress::of(&[]);
        assert_eq!(p.total, 0);
        assert_eq!(p.percent(), 0.0);
    }

    #[test]
    fn progress_ratio() {
        let tasks = vec![task("a", true), task("b", false), task("c", true), task("d", false)];
        let p = Progress::of(&tasks);
        assert_eq!((p.completed, p.total), (2, 4));
        assert_eq!(p.percent(), 50.0);
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(NewTask::new("   ", Category::Work).validate().is_err());
        assert!(NewTask::new("Write report", Category::Work).validate().is_ok());
    }

    #[test]
    fn out_of_range_day_is_rejected() {
        let t = NewTask::new("Gym", Category::Workout).repeating(Recurrence::custom([1, 7]));
        assert!(t.validate().is_err());
    }

    #[test]
    fn normalized_sorts_custom_days_and_drops_days_for_daily() {
        let custom = NewTask::new("  Gym ", Category::Workout)
            .repeating(Recurrence::custom([5, 1, 5, 3]))
            .normalized();
        assert_eq!(custom.content, "Gym");
        assert_eq!(
            custom.recurrence.unwrap().days_of_week,
            Some(vec![1, 3, 5])
        );

        let daily = NewTask::new("Walk", Category::Personal)
            .repeating(Recurrence {
                kind: RecurrenceKind::Daily,
                days_of_week: Some(vec![2]),
            })
            .normalized();
        assert_eq!(daily.recurrence.unwrap().days_of_week, None);
    }

    #[test]
    fn new_task_wire_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let json = serde_json::to_value(NewTask::new("Read", Category::Study).on(date)).unwrap();
        assert_eq!(json["content"], "Read");
        assert_eq!(json["category"], "Study");
        assert_eq!(json["date"], "2024-06-01");
        assert!(json.get("isShared").is_none());
        assert!(json.get("recurrence").is_none());

        let goal = serde_json::to_value(NewTask::shared_goal("Save money")).unwrap();
        assert_eq!(goal["isShared"], true);
        assert_eq!(goal["category"], "Other");

        let rec = serde_json::to_value(
            NewTask::new("Gym", Category::Workout).repeating(Recurrence::weekly()),
        )
        .unwrap();
        assert_eq!(rec["isRecurring"], true);
        assert_eq!(rec["recurrence"]["type"], "weekly");
    }
}
