//! Text rendering of UI events.
//!
//! [`View`] mirrors what a graphical client would show (name, room, roster,
//! bookmarks) and turns each [`UiEvent`] into at most one output line.

use tocsin_client::runtime::UiEvent;
use tocsin_proto::{DisplayName, RoomCode};

/// Client state as last reported by the runtime.
#[derive(Debug, Default)]
pub struct View {
    name: Option<DisplayName>,
    room: Option<RoomCode>,
    members: Vec<String>,
    bookmarks: Vec<RoomCode>,
}

impl View {
    /// Empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. Returns the line to print, if any.
    pub fn apply(&mut self, event: UiEvent) -> Option<String> {
        match event {
            UiEvent::NameChanged(name) => {
                let line = format!("you are {name}");
                self.name = Some(name);
                Some(line)
            },
            UiEvent::RoomChanged(Some(room)) => {
                let line = format!("in room {room}");
                self.room = Some(room);
                Some(line)
            },
            UiEvent::RoomChanged(None) => {
                self.room.take().map(|room| format!("no longer in room {room}"))
            },
            UiEvent::MembersChanged(members) => {
                self.members = members;
                (!self.members.is_empty()).then(|| format!("members: {}", self.members.join(", ")))
            },
            UiEvent::BookmarksChanged(bookmarks) => {
                self.bookmarks = bookmarks;
                None
            },
            UiEvent::Alert { title, message } => Some(format!("[{title}] {message}")),
        }
    }

    /// Multi-line summary for `status`.
    pub fn status(&self) -> String {
        let name = self.name.as_ref().map_or("-", DisplayName::as_str);
        let room = self.room.as_ref().map_or("-", RoomCode::as_str);
        let members = if self.members.is_empty() { "-".to_string() } else { self.members.join(", ") };
        format!("name: {name}\nroom: {room}\nmembers: {members}")
    }

    /// Listing for `bookmarks`, oldest first.
    pub fn bookmarks(&self) -> String {
        if self.bookmarks.is_empty() {
            return "no bookmarks".to_string();
        }
        self.bookmarks.iter().map(|code| format!("  {code}")).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[test]
    fn status_before_anything_happened() {
        insta::assert_snapshot!(View::new().status(), @r"
        name: -
        room: -
        members: -
        ");
    }

    #[test]
    fn status_in_a_room() {
        let mut view = View::new();
        view.apply(UiEvent::NameChanged(DisplayName::parse("alice").unwrap()));
        view.apply(UiEvent::RoomChanged(Some(code("42042"))));
        view.apply(UiEvent::MembersChanged(vec!["alice".into(), "bob".into()]));

        insta::assert_snapshot!(view.status(), @r"
        name: alice
        room: 42042
        members: alice, bob
        ");
    }

    #[test]
    fn event_lines() {
        let mut view = View::new();

        let lines: Vec<Option<String>> = vec![
            view.apply(UiEvent::NameChanged(DisplayName::parse("user12345").unwrap())),
            view.apply(UiEvent::RoomChanged(Some(code("42042")))),
            view.apply(UiEvent::MembersChanged(vec!["user12345".into()])),
            view.apply(UiEvent::Alert {
                title: "Emergency!".into(),
                message: "bob raised an emergency in room 42042!".into(),
            }),
            view.apply(UiEvent::MembersChanged(Vec::new())),
            view.apply(UiEvent::RoomChanged(None)),
            view.apply(UiEvent::RoomChanged(None)),
        ];

        insta::assert_debug_snapshot!(lines, @r#"
        [
            Some(
                "you are user12345",
            ),
            Some(
                "in room 42042",
            ),
            Some(
                "members: user12345",
            ),
            Some(
                "[Emergency!] bob raised an emergency in room 42042!",
            ),
            None,
            Some(
                "no longer in room 42042",
            ),
            None,
        ]
        "#);
    }

    #[test]
    fn bookmark_listing() {
        let mut view = View::new();
        assert_eq!(view.bookmarks(), "no bookmarks");

        view.apply(UiEvent::BookmarksChanged(vec![code("11111"), code("42042")]));

        assert_eq!(view.bookmarks(), "  11111\n  42042");
    }
}
