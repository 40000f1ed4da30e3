use geojson::JsonObject;
use serde::Serialize;

use crate::entities::Coordinates;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupKind {
    /// Opened by a click, stays until closed.
    Persistent,
    /// Follows the pointer while hovering a feature.
    Transient,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub kind: PopupKind,
    pub layer_id: String,
    pub at: Coordinates,
    pub properties: JsonObject,
}

impl Popup {
    pub fn new<S: Into<String>>(
        kind: PopupKind,
        layer_id: S,
        at: Coordinates,
        properties: JsonObject,
    ) -> Self {
        Self {
            kind,
            layer_id: layer_id.into(),
            at,
            properties,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PopupCommand {
    Open(Popup),
    Close(PopupKind),
}

/// Hover and click popups share feature layers; a persistent popup always wins.
#[derive(Debug, Default)]
pub struct PopupController {
    persistent: Option<Popup>,
    transient: Option<Popup>,
}

impl PopupController {
    pub fn persistent(&self) -> Option<&Popup> {
        self.persistent.as_ref()
    }

    pub fn transient(&self) -> Option<&Popup> {
        self.transient.as_ref()
    }

    pub fn hover(
        &mut self,
        at: Coordinates,
        layer_id: &str,
        properties: JsonObject,
    ) -> Vec<PopupCommand> {
        if self.persistent.is_some() {
            return vec![];
        }

        let mut commands = vec![];
        if self.transient.take().is_some() {
            commands.push(PopupCommand::Close(PopupKind::Transient));
        }

        let popup = Popup::new(PopupKind::Transient, layer_id, at, properties);
        self.transient = Some(popup.clone());
        commands.push(PopupCommand::Open(popup));
        commands
    }

    pub fn hover_end(&mut self) -> Vec<PopupCommand> {
        match self.transient.take() {
            Some(_) => vec![PopupCommand::Close(PopupKind::Transient)],
            None => vec![],
        }
    }

    pub fn click(
        &mut self,
        at: Coordinates,
        layer_id: &str,
        properties: JsonObject,
    ) -> Vec<PopupCommand> {
        let mut commands = self.hover_end();
        if self.persistent.take().is_some() {
            commands.push(PopupCommand::Close(PopupKind::Persistent));
        }

        let popup = Popup::new(PopupKind::Persistent, layer_id, at, properties);
        self.persistent = Some(popup.clone());
        commands.push(PopupCommand::Open(popup));
        commands
    }

    pub fn close_persistent(&mut self) -> Vec<PopupCommand> {
        match self.persistent.take() {
            Some(_) => vec![PopupCommand::Close(PopupKind::Persistent)],
            None => vec![],
        }
    }

    pub fn close_all(&mut self) -> Vec<PopupCommand> {
        let mut commands = self.hover_end();
        commands.extend(self.close_persistent());
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Coordinates {
        Coordinates::new(-23.0, -46.0)
    }

    #[test]
    fn hover_is_suppressed_while_persistent_is_open() {
        let mut popups = PopupController::default();

        assert_eq!(popups.hover(at(), "tolls-points", JsonObject::new()).len(), 1);

        let commands = popups.click(at(), "tolls-points", JsonObject::new());
        assert_eq!(commands[0], PopupCommand::Close(PopupKind::Transient));
        assert!(matches!(
            commands[1],
            PopupCommand::Open(ref p) if p.kind == PopupKind::Persistent
        ));
        assert!(popups.transient().is_none());

        assert!(popups.hover(at(), "tolls-points", JsonObject::new()).is_empty());
        assert!(popups.transient().is_none());

        popups.close_persistent();
        assert_eq!(popups.hover(at(), "tolls-points", JsonObject::new()).len(), 1);
    }

    #[test]
    fn only_one_persistent_popup() {
        let mut popups = PopupController::default();
        popups.click(at(), "tolls-points", JsonObject::new());

        let commands = popups.click(at(), "accidents-points", JsonObject::new());
        assert_eq!(commands[0], PopupCommand::Close(PopupKind::Persistent));
        assert_eq!(popups.persistent().unwrap().layer_id, "accidents-points");
    }
}
