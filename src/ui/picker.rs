#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    pub id: String,
    pub label: String,
}

/// Selection over a list of items, shared by the model table and the
/// context browser.
#[derive(Debug, Clone)]
pub struct PickerState {
    pub title: String,
    pub items: Vec<PickerItem>,
    pub selected: usize,
}

impl PickerState {
    pub fn new<T: Into<String>>(title: T, items: Vec<PickerItem>, selected: usize) -> Self {
        let mut state = Self {
            title: title.into(),
            items,
            selected,
        };
        state.clamp_selection();
        state
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.items.get(self.selected).map(|i| i.id.as_str())
    }

    /// Replace the items, keeping the selection on the same id when it survives.
    pub fn set_items(&mut self, items: Vec<PickerItem>) {
        let previous = self.selected_id().map(str::to_string);
        self.items = items;
        self.selected = previous
            .and_then(|id| self.items.iter().position(|item| item.id == id))
            .unwrap_or(0);
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            if self.selected == 0 {
                self.selected = self.items.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn move_to_start(&mut self) {
        self.selected = 0;
    }

    pub fn move_to_end(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }
}
