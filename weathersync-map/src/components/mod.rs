pub mod map_view;
pub mod status_bar;
pub mod weather_popup;

use ratatui::{layout::Rect, Frame};

use crate::input::HostEvent;

pub use map_view::{MapView, MapViewProps};
pub use status_bar::{StatusBar, StatusBarProps};
pub use weather_popup::{popup_lines, WeatherPopup, WeatherPopupProps};

/// A UI element that renders from props and turns input into actions.
///
/// View-only state (cursor position, zoom) lives in `&mut self`; anything
/// the sync core owns changes only through the returned actions.
pub trait Component<A = ()> {
    /// Data required to render the component (read-only)
    type Props<'a>;

    /// Handle an event and return actions to dispatch.
    ///
    /// Returns `None` for no actions, `Some(action)` for one, or any other
    /// iterator. Render-only components keep the default.
    #[allow(unused_variables)]
    fn handle_event(
        &mut self,
        event: &HostEvent,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = A> {
        None::<A>
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>);
}
