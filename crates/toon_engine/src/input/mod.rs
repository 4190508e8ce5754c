//! Input translation
//!
//! Turns raw GLFW window events into [`InputEvent`]s. Mode keys act on
//! release, movement keys are held and produce one [`InputEvent::Move`] per
//! frame while down, and dragging with the left mouse button looks around.

use glfw::{Action, Key, MouseButton, WindowEvent};

use crate::render::{CameraMove, RenderMode};

/// Something the application should react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Switch shading mode
    SetMode(RenderMode),
    /// Move the camera one frame's worth in a direction
    Move(CameraMove),
    /// Rotate the camera by a cursor delta in pixels
    Look {
        /// Horizontal delta
        dx: f32,
        /// Vertical delta
        dy: f32,
    },
    /// Framebuffer changed size
    Resize {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// Close the application
    Quit,
}

/// What a key is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBinding {
    /// Selects a render mode on release
    Mode(RenderMode),
    /// Moves the camera while held
    Move(CameraMove),
    /// Quits on press
    Quit,
}

/// Binding for `key`, if any. Every key maps to at most one action.
pub fn key_binding(key: Key) -> Option<KeyBinding> {
    let binding = match key {
        Key::Num1 | Key::Kp1 => KeyBinding::Mode(RenderMode::Default),
        Key::Num2 | Key::Kp2 => KeyBinding::Mode(RenderMode::Toon),
        Key::Num3 | Key::Kp3 => KeyBinding::Mode(RenderMode::ToonOutlines),
        Key::W => KeyBinding::Move(CameraMove::Forward),
        Key::S => KeyBinding::Move(CameraMove::Backward),
        Key::A => KeyBinding::Move(CameraMove::Left),
        Key::D => KeyBinding::Move(CameraMove::Right),
        Key::Q => KeyBinding::Move(CameraMove::Up),
        Key::E => KeyBinding::Move(CameraMove::Down),
        Key::Escape => KeyBinding::Quit,
        _ => return None,
    };
    Some(binding)
}

/// Tracks held keys and the mouse drag between frames
#[derive(Debug, Default)]
pub struct InputState {
    held: Vec<CameraMove>,
    dragging: bool,
    cursor: Option<(f64, f64)>,
    pending: Vec<InputEvent>,
}

impl InputState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one window event
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::Key(key, _, action, _) => self.handle_key(key, action),
            WindowEvent::MouseButton(MouseButton::Button1, action, _) => {
                self.dragging = action != Action::Release;
                if !self.dragging {
                    self.cursor = None;
                }
            }
            WindowEvent::CursorPos(x, y) => self.handle_cursor(x, y),
            WindowEvent::FramebufferSize(width, height) => self.pending.push(InputEvent::Resize {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            }),
            WindowEvent::Close => self.pending.push(InputEvent::Quit),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: Key, action: Action) {
        let Some(binding) = key_binding(key) else {
            return;
        };
        match (binding, action) {
            (KeyBinding::Mode(mode), Action::Release) => self.pending.push(InputEvent::SetMode(mode)),
            (KeyBinding::Move(direction), Action::Press) => {
                if !self.held.contains(&direction) {
                    self.held.push(direction);
                }
            }
            (KeyBinding::Move(direction), Action::Release) => self.held.retain(|&d| d != direction),
            (KeyBinding::Quit, Action::Press) => self.pending.push(InputEvent::Quit),
            _ => {}
        }
    }

    fn handle_cursor(&mut self, x: f64, y: f64) {
        if !self.dragging {
            return;
        }
        if let Some((last_x, last_y)) = self.cursor {
            let (dx, dy) = ((x - last_x) as f32, (y - last_y) as f32);
            if dx != 0.0 || dy != 0.0 {
                self.pending.push(InputEvent::Look { dx, dy });
            }
        }
        self.cursor = Some((x, y));
    }

    /// Movement directions currently held, in press order
    pub fn held_moves(&self) -> &[CameraMove] {
        &self.held
    }

    /// Drain the events for this frame: discrete events in arrival order,
    /// then one move per held direction
    pub fn frame_events(&mut self) -> Vec<InputEvent> {
        let mut events = std::mem::take(&mut self.pending);
        events.extend(self.held.iter().map(|&direction| InputEvent::Move(direction)));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glfw::Modifiers;

    fn key(key: Key, action: Action) -> WindowEvent {
        WindowEvent::Key(key, 0, action, Modifiers::empty())
    }

    #[test]
    fn test_each_key_maps_to_one_action() {
        assert_eq!(key_binding(Key::E), Some(KeyBinding::Move(CameraMove::Down)));
        assert_eq!(key_binding(Key::Q), Some(KeyBinding::Move(CameraMove::Up)));
        assert_eq!(key_binding(Key::Num3), Some(KeyBinding::Mode(RenderMode::ToonOutlines)));
        assert_eq!(key_binding(Key::Escape), Some(KeyBinding::Quit));
        assert_eq!(key_binding(Key::Z), None);
    }

    #[test]
    fn test_mode_switches_on_release_only() {
        let mut input = InputState::new();
        input.handle_event(&key(Key::Num2, Action::Press));
        assert!(input.frame_events().is_empty());

        input.handle_event(&key(Key::Num2, Action::Release));
        assert_eq!(input.frame_events(), vec![InputEvent::SetMode(RenderMode::Toon)]);
    }

    #[test]
    fn test_e_moves_down_only() {
        let mut input = InputState::new();
        input.handle_event(&key(Key::E, Action::Press));
        assert_eq!(input.frame_events(), vec![InputEvent::Move(CameraMove::Down)]);
    }

    #[test]
    fn test_held_keys_repeat_each_frame_until_released() {
        let mut input = InputState::new();
        input.handle_event(&key(Key::W, Action::Press));
        input.handle_event(&key(Key::A, Action::Press));
        input.handle_event(&key(Key::W, Action::Repeat));

        let expected = vec![InputEvent::Move(CameraMove::Forward), InputEvent::Move(CameraMove::Left)];
        assert_eq!(input.frame_events(), expected);
        assert_eq!(input.frame_events(), expected);

        input.handle_event(&key(Key::W, Action::Release));
        assert_eq!(input.frame_events(), vec![InputEvent::Move(CameraMove::Left)]);
    }

    #[test]
    fn test_drag_produces_look_deltas() {
        let mut input = InputState::new();
        input.handle_event(&WindowEvent::CursorPos(10.0, 10.0));
        input.handle_event(&WindowEvent::MouseButton(MouseButton::Button1, Action::Press, Modifiers::empty()));
        input.handle_event(&WindowEvent::CursorPos(10.0, 10.0));
        input.handle_event(&WindowEvent::CursorPos(14.0, 7.0));
        assert_eq!(input.frame_events(), vec![InputEvent::Look { dx: 4.0, dy: -3.0 }]);

        input.handle_event(&WindowEvent::MouseButton(MouseButton::Button1, Action::Release, Modifiers::empty()));
        input.handle_event(&WindowEvent::CursorPos(20.0, 20.0));
        assert!(input.frame_events().is_empty());
    }

    #[test]
    fn test_escape_and_resize() {
        let mut input = InputState::new();
        input.handle_event(&WindowEvent::FramebufferSize(1024, 768));
        input.handle_event(&key(Key::Escape, Action::Press));
        assert_eq!(
            input.frame_events(),
            vec![InputEvent::Resize { width: 1024, height: 768 }, InputEvent::Quit]
        );
    }
}
