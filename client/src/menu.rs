//! Menu definitions and the navigation stack.

/// What choosing a menu entry asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Host a game just for this client.
    StartSinglePlayer,
    /// Host a game others can join.
    HostMultiplayer,
    /// Join a game somebody else is hosting on this machine.
    JoinMultiplayer,
    /// Pick untimed play or a fixed game length.
    SelectMode { game_time: i64 },
    /// Pick the open field or an obstacle world with deadly walls.
    SelectWorld { obstacles: bool },
    Back,
    Quit,
}

#[derive(Debug, Clone)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
}

/// One menu screen with a selection cursor.
#[derive(Debug, Clone)]
pub struct Menu {
    pub title: &'static str,
    pub items: Vec<MenuItem>,
    pub selected: usize,
}

impl Menu {
    fn new(title: &'static str, items: Vec<MenuItem>) -> Self {
        Menu {
            title,
            items,
            selected: 0,
        }
    }

    pub fn main() -> Menu {
        Menu::new(
            "serpent",
            vec![
                MenuItem {
                    label: "New Game",
                    action: MenuAction::StartSinglePlayer,
                },
                MenuItem {
                    label: "Host Game",
                    action: MenuAction::HostMultiplayer,
                },
                MenuItem {
                    label: "Join Game",
                    action: MenuAction::JoinMultiplayer,
                },
                MenuItem {
                    label: "Quit",
                    action: MenuAction::Quit,
                },
            ],
        )
    }

    pub fn mode_select() -> Menu {
        Menu::new(
            "game mode",
            vec![
                MenuItem {
                    label: "Endless",
                    action: MenuAction::SelectMode { game_time: -1 },
                },
                MenuItem {
                    label: "Timed (2 minutes)",
                    action: MenuAction::SelectMode { game_time: 120 },
                },
                MenuItem {
                    label: "Back",
                    action: MenuAction::Back,
                },
            ],
        )
    }

    pub fn world_select() -> Menu {
        Menu::new(
            "world",
            vec![
                MenuItem {
                    label: "Open field (walls wrap around)",
                    action: MenuAction::SelectWorld { obstacles: false },
                },
                MenuItem {
                    label: "Obstacles (walls are deadly)",
                    action: MenuAction::SelectWorld { obstacles: true },
                },
                MenuItem {
                    label: "Back",
                    action: MenuAction::Back,
                },
            ],
        )
    }

    pub fn select_previous(&mut self) {
        if self.selected == 0 {
            self.selected = self.items.len() - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.items.len();
    }

    pub fn selected_action(&self) -> MenuAction {
        self.items[self.selected].action
    }
}

/// Stack of nested menu screens. The bottom entry is the main menu and can
/// never be popped.
#[derive(Debug)]
pub struct MenuStack {
    stack: Vec<Menu>,
}

impl MenuStack {
    pub fn new(root: Menu) -> Self {
        MenuStack { stack: vec![root] }
    }

    pub fn push(&mut self, menu: Menu) {
        self.stack.push(menu);
    }

    /// Pops the current screen. A no-op on a single-element stack.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Pops everything above the root.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }

    pub fn current(&self) -> &Menu {
        self.stack.last().expect("menu stack is never empty")
    }

    pub fn current_mut(&mut self) -> &mut Menu {
        self.stack.last_mut().expect("menu stack is never empty")
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_on_single_element_stack_is_noop() {
        let mut menus = MenuStack::new(Menu::main());
        menus.pop();
        assert_eq!(menus.depth(), 1);
        assert_eq!(menus.current().title, "serpent");
    }

    #[test]
    fn test_push_and_pop() {
        let mut menus = MenuStack::new(Menu::main());
        menus.push(Menu::mode_select());
        assert_eq!(menus.depth(), 2);
        assert_eq!(menus.current().title, "game mode");
        menus.pop();
        assert_eq!(menus.current().title, "serpent");
    }

    #[test]
    fn test_reset_keeps_only_root() {
        let mut menus = MenuStack::new(Menu::main());
        menus.push(Menu::mode_select());
        menus.push(Menu::world_select());
        menus.reset();
        assert_eq!(menus.depth(), 1);
    }

    #[test]
    fn test_selection_wraps_both_ways() {
        let mut menu = Menu::main();
        assert_eq!(menu.selected, 0);
        menu.select_previous();
        assert_eq!(menu.selected, menu.items.len() - 1);
        menu.select_next();
        assert_eq!(menu.selected, 0);
    }

    #[test]
    fn test_selected_action_follows_cursor() {
        let mut menu = Menu::main();
        assert_eq!(menu.selected_action(), MenuAction::StartSinglePlayer);
        menu.select_next();
        assert_eq!(menu.selected_action(), MenuAction::HostMultiplayer);
    }
}
