use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Jump,
    Crouch,
}

/// A device-agnostic action change. Keyboard, touch and gamepad all end up here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub action: Action,
    pub pressed: bool,
}

impl InputEvent {
    pub fn press(action: Action) -> Self {
        InputEvent {
            action,
            pressed: true,
        }
    }

    pub fn release(action: Action) -> Self {
        InputEvent {
            action,
            pressed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub crouch: bool,
}

impl InputState {
    pub fn is_held(&self, action: Action) -> bool {
        match action {
            Action::Left => self.left,
            Action::Right => self.right,
            Action::Jump => self.jump,
            Action::Crouch => self.crouch,
        }
    }

    /// Records the new held state and returns whether this was a rising edge.
    pub fn set(&mut self, action: Action, pressed: bool) -> bool {
        let was_held = self.is_held(action);
        let slot = match action {
            Action::Left => &mut self.left,
            Action::Right => &mut self.right,
            Action::Jump => &mut self.jump,
            Action::Crouch => &mut self.crouch,
        };
        *slot = pressed;
        pressed && !was_held
    }
}

pub struct Keymap {
    bindings: HashMap<String, Action>,
}

impl Keymap {
    pub fn bind(&mut self, code: &str, action: Action) {
        self.bindings.insert(code.into(), action);
    }

    pub fn action_for(&self, code: &str) -> Option<Action> {
        self.bindings.get(code).copied()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keymap = Keymap {
            bindings: HashMap::new(),
        };
        keymap.bind("ArrowLeft", Action::Left);
        keymap.bind("KeyA", Action::Left);
        keymap.bind("ArrowRight", Action::Right);
        keymap.bind("KeyD", Action::Right);
        keymap.bind("Space", Action::Jump);
        keymap.bind("ArrowUp", Action::Jump);
        keymap.bind("KeyW", Action::Jump);
        keymap.bind("ArrowDown", Action::Crouch);
        keymap.bind("KeyS", Action::Crouch);
        keymap
    }
}

/// Turns raw key codes into action events. Several keys can drive one
/// action, so the action is released only when the last of them goes up.
pub struct KeyboardInput {
    keymap: Keymap,
    held: HashMap<Action, HashSet<String>>,
}

impl KeyboardInput {
    pub fn new(keymap: Keymap) -> Self {
        KeyboardInput {
            keymap,
            held: HashMap::new(),
        }
    }

    pub fn translate(&mut self, code: &str, pressed: bool) -> Option<InputEvent> {
        let action = self.keymap.action_for(code)?;
        let keys = self.held.entry(action).or_default();

        if pressed {
            keys.insert(code.to_string());
            Some(InputEvent::press(action))
        } else {
            keys.remove(code);
            if keys.is_empty() {
                Some(InputEvent::release(action))
            } else {
                None
            }
        }
    }
}

impl Default for KeyboardInput {
    fn default() -> Self {
        KeyboardInput::new(Keymap::default())
    }
}
