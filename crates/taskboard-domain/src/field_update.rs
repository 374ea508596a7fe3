/// Three-state update for an optional task field.
///
/// - `NoChange`: keep the current value
/// - `Set(value)`: replace it
/// - `Clear`: remove it
///
/// # Example
///
/// ```
/// use taskboard_domain::FieldUpdate;
///
/// let mut assignee = Some("ana".to_string());
/// FieldUpdate::Set("li".to_string()).apply_to(&mut assignee);
/// assert_eq!(assignee.as_deref(), Some("li"));
///
/// FieldUpdate::<String>::Clear.apply_to(&mut assignee);
/// assert_eq!(assignee, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    NoChange,
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, FieldUpdate::NoChange)
    }

    /// Build an update from a command-line style pair of "new value" and "clear" flag.
    ///
    /// `clear` wins over a value so `--due 2024-01-01 --clear-due` clears.
    ///
    /// ```
    /// use taskboard_domain::FieldUpdate;
    ///
    /// assert_eq!(FieldUpdate::from_flags(Some(3), false), FieldUpdate::Set(3));
    /// assert_eq!(FieldUpdate::from_flags(Some(3), true), FieldUpdate::Clear);
    /// assert_eq!(FieldUpdate::<u8>::from_flags(None, false), FieldUpdate::NoChange);
    /// ```
    pub fn from_flags(value: Option<T>, clear: bool) -> Self {
        match (value, clear) {
            (_, true) => FieldUpdate::Clear,
            (Some(value), false) => FieldUpdate::Set(value),
            (None, false) => FieldUpdate::NoChange,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldUpdate<U> {
        match self {
            FieldUpdate::NoChange => FieldUpdate::NoChange,
            FieldUpdate::Set(value) => FieldUpdate::Set(f(value)),
            FieldUpdate::Clear => FieldUpdate::Clear,
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// `Some` sets the field, `None` clears it.
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}
