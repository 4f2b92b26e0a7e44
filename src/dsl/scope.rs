//! Scope chain — a stack of binding frames.
//!
//! The outermost frame holds the built-in registry, the next one the
//! program's assignments; blocks such as the mixer push a child frame and pop
//! it when they end.

#[derive(Clone, Debug, PartialEq)]
pub struct Scope<T> {
    frames: Vec<Vec<(String, T)>>,
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scope<T> {
    /// A scope with a single, empty frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Drop the innermost frame. The outermost frame is never removed.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind `name` in the innermost frame, replacing an existing local binding.
    pub fn bind(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        match frame.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => frame.push((name, value)),
        }
    }

    /// Look `name` up from the innermost frame outwards.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }

    /// Look `name` up in the innermost frame only.
    pub fn lookup_local(&self, name: &str) -> Option<&T> {
        self.frames
            .last()
            .and_then(|frame| frame.iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frame_shadows_outer() {
        let mut scope = Scope::new();
        scope.bind("drums", 1);
        scope.push();
        scope.bind("drums", 2);
        assert_eq!(scope.lookup("drums"), Some(&2));
        scope.pop();
        assert_eq!(scope.lookup("drums"), Some(&1));
    }

    #[test]
    fn lookup_falls_through_to_outer_frames() {
        let mut scope = Scope::new();
        scope.bind("kick", "instrument");
        scope.push();
        assert_eq!(scope.lookup("kick"), Some(&"instrument"));
        assert_eq!(scope.lookup_local("kick"), None);
    }

    #[test]
    fn rebinding_replaces_local() {
        let mut scope = Scope::new();
        scope.bind("a", 1);
        scope.bind("a", 2);
        assert_eq!(scope.lookup("a"), Some(&2));
    }

    #[test]
    fn outermost_frame_survives_pop() {
        let mut scope: Scope<i32> = Scope::new();
        scope.pop();
        scope.bind("x", 3);
        scope.pop();
        assert_eq!(scope.lookup_local("x"), Some(&3));
    }
}
