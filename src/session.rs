//! Interaction state for the crop and bbox windows.
//!
//! Both sessions consume [`Input`] values and never touch a display
//! surface, so the windows in `ui` only translate toolkit events.

use tracing::{debug, info, warn};

use crate::geometry::{Point, Rect, Scaler};

pub const KEY_CONFIRM: char = 'c';
pub const KEY_QUIT: char = 'q';
pub const KEY_SAVE: char = 's';
pub const KEY_RESET: char = 'r';

/// Operator input, in display space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Key(char),
}

// ── Crop Selector ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropState {
    Idle,
    Dragging { start: Point, current: Point },
    RegionSet,
    Confirmed,
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct CropSession {
    scaler: Scaler,
    state: CropState,
    /// Original-space region of the reference image.
    region: Option<Rect>,
}

impl CropSession {
    pub fn new(scaler: Scaler) -> Self {
        Self {
            scaler,
            state: CropState::Idle,
            region: None,
        }
    }

    pub fn state(&self) -> CropState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, CropState::Confirmed | CropState::Cancelled)
    }

    pub fn region(&self) -> Option<Rect> {
        self.region
    }

    /// The region as it should be drawn over the preview.
    pub fn region_on_display(&self) -> Option<Rect> {
        self.region.map(|r| self.scaler.rect_to_display(r))
    }

    /// Region only once the operator confirmed it.
    pub fn confirmed_region(&self) -> Option<Rect> {
        match self.state {
            CropState::Confirmed => self.region,
            _ => None,
        }
    }

    /// Rectangle currently being dragged, in display space.
    pub fn preview(&self) -> Option<Rect> {
        match self.state {
            CropState::Dragging { start, current } => Some(Rect::from_corners(start, current)),
            _ => None,
        }
    }

    pub fn handle(&mut self, input: Input) {
        if self.is_finished() {
            return;
        }
        match input {
            Input::PointerDown(p) => {
                self.state = CropState::Dragging {
                    start: p,
                    current: p,
                };
            }
            Input::PointerMove(p) => {
                if let CropState::Dragging { current, .. } = &mut self.state {
                    *current = p;
                }
            }
            Input::PointerUp(p) => {
                if let CropState::Dragging { start, .. } = self.state {
                    let drawn = Rect::from_corners(start, p);
                    if drawn.is_degenerate() {
                        debug!("ignoring empty crop drag at {drawn}");
                    } else {
                        let region = self.scaler.rect_to_original(drawn);
                        debug!("crop region set to {region}");
                        self.region = Some(region);
                    }
                    self.state = self.resting_state();
                }
            }
            Input::Key(KEY_CONFIRM) => {
                if self.region.is_some() && !matches!(self.state, CropState::Dragging { .. }) {
                    self.state = CropState::Confirmed;
                }
            }
            Input::Key(KEY_QUIT) => {
                self.state = CropState::Cancelled;
            }
            Input::Key(_) => {}
        }
    }

    /// Treat a closed window as a cancel.
    pub fn abandon(&mut self) {
        if !self.is_finished() {
            self.state = CropState::Cancelled;
        }
    }

    fn resting_state(&self) -> CropState {
        if self.region.is_some() {
            CropState::RegionSet
        } else {
            CropState::Idle
        }
    }
}

// ── BBox Annotator ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BBoxState {
    Idle,
    Drawing { start: Point, current: Point },
    Saved,
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct BBoxSession {
    scaler: Scaler,
    state: BBoxState,
    /// Completed boxes in display space, in drawing order.
    boxes: Vec<Rect>,
}

impl BBoxSession {
    pub fn new(scaler: Scaler) -> Self {
        Self {
            scaler,
            state: BBoxState::Idle,
            boxes: Vec::new(),
        }
    }

    pub fn state(&self) -> BBoxState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BBoxState::Saved | BBoxState::Cancelled)
    }

    pub fn boxes(&self) -> &[Rect] {
        &self.boxes
    }

    pub fn preview(&self) -> Option<Rect> {
        match self.state {
            BBoxState::Drawing { start, current } => Some(Rect::from_corners(start, current)),
            _ => None,
        }
    }

    /// Saved boxes mapped to the template's resolution. Empty unless saved.
    pub fn saved_boxes(&self) -> Vec<Rect> {
        match self.state {
            BBoxState::Saved => self
                .boxes
                .iter()
                .map(|b| self.scaler.rect_to_original(*b))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn handle(&mut self, input: Input) {
        if self.is_finished() {
            return;
        }
        match input {
            Input::PointerDown(p) => {
                self.state = BBoxState::Drawing {
                    start: p,
                    current: p,
                };
            }
            Input::PointerMove(p) => {
                if let BBoxState::Drawing { current, .. } = &mut self.state {
                    *current = p;
                }
            }
            Input::PointerUp(p) => {
                if let BBoxState::Drawing { start, .. } = self.state {
                    let drawn = Rect::from_corners(start, p);
                    if drawn.is_degenerate() {
                        debug!("ignoring empty bbox at {drawn}");
                    } else {
                        self.boxes.push(drawn);
                        debug!("bbox #{} drawn at {drawn}", self.boxes.len());
                    }
                    self.state = BBoxState::Idle;
                }
            }
            Input::Key(KEY_RESET) => {
                self.boxes.clear();
                self.state = BBoxState::Idle;
                info!("all boxes cleared");
            }
            Input::Key(KEY_SAVE) => {
                if self.boxes.is_empty() {
                    warn!("no boxes drawn, nothing will be saved");
                }
                self.state = BBoxState::Saved;
            }
            Input::Key(KEY_QUIT) => {
                self.boxes.clear();
                self.state = BBoxState::Cancelled;
            }
            Input::Key(_) => {}
        }
    }

    pub fn abandon(&mut self) {
        if !self.is_finished() {
            self.boxes.clear();
            self.state = BBoxState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(from: (i32, i32), to: (i32, i32)) -> [Input; 3] {
        [
            Input::PointerDown(Point::new(from.0, from.1)),
            Input::PointerMove(Point::new((from.0 + to.0) / 2, (from.1 + to.1) / 2)),
            Input::PointerUp(Point::new(to.0, to.1)),
        ]
    }

    #[test]
    fn test_crop_drag_sets_original_region() {
        let mut session = CropSession::new(Scaler::default());
        for input in drag((50, 25), (200, 150)) {
            session.handle(input);
        }
        assert_eq!(session.state(), CropState::RegionSet);
        assert_eq!(
            session.region(),
            Some(Rect::from_corners(Point::new(100, 50), Point::new(400, 300)))
        );
        assert_eq!(
            session.region_on_display(),
            Some(Rect::from_corners(Point::new(50, 25), Point::new(200, 150)))
        );
    }

    #[test]
    fn test_crop_region_normalized_for_reverse_drag() {
        for (from, to) in [((200, 150), (50, 25)), ((200, 25), (50, 150)), ((50, 150), (200, 25))] {
            let mut session = CropSession::new(Scaler::default());
            for input in drag(from, to) {
                session.handle(input);
            }
            let region = session.region().unwrap();
            assert!(region.x1 <= region.x2);
            assert!(region.y1 <= region.y2);
            assert_eq!(region, Rect::from_corners(Point::new(100, 50), Point::new(400, 300)));
        }
    }

    #[test]
    fn test_crop_move_only_updates_preview() {
        let mut session = CropSession::new(Scaler::default());
        session.handle(Input::PointerDown(Point::new(10, 10)));
        session.handle(Input::PointerMove(Point::new(30, 40)));
        assert_eq!(
            session.preview(),
            Some(Rect::from_corners(Point::new(10, 10), Point::new(30, 40)))
        );
        assert_eq!(session.region(), None);

        // moves without a press are ignored
        let mut idle = CropSession::new(Scaler::default());
        idle.handle(Input::PointerMove(Point::new(5, 5)));
        assert_eq!(idle.state(), CropState::Idle);
    }

    #[test]
    fn test_confirm_requires_region() {
        let mut session = CropSession::new(Scaler::default());
        session.handle(Input::Key(KEY_CONFIRM));
        assert_eq!(session.state(), CropState::Idle);
        assert_eq!(session.confirmed_region(), None);

        for input in drag((0, 0), (10, 10)) {
            session.handle(input);
        }
        session.handle(Input::Key(KEY_CONFIRM));
        assert_eq!(session.state(), CropState::Confirmed);
        assert!(session.confirmed_region().is_some());
    }

    #[test]
    fn test_click_without_drag_keeps_previous_region() {
        let mut session = CropSession::new(Scaler::default());
        for input in drag((0, 0), (10, 10)) {
            session.handle(input);
        }
        let before = session.region();
        session.handle(Input::PointerDown(Point::new(40, 40)));
        session.handle(Input::PointerUp(Point::new(40, 40)));
        assert_eq!(session.region(), before);
        assert_eq!(session.state(), CropState::RegionSet);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut session = CropSession::new(Scaler::default());
        session.handle(Input::Key(KEY_QUIT));
        assert_eq!(session.state(), CropState::Cancelled);
        for input in drag((0, 0), (10, 10)) {
            session.handle(input);
        }
        session.handle(Input::Key(KEY_CONFIRM));
        assert_eq!(session.state(), CropState::Cancelled);
        assert_eq!(session.confirmed_region(), None);
    }

    #[test]
    fn test_bbox_reset_then_save() {
        let mut session = BBoxSession::new(Scaler::default());
        for input in drag((0, 0), (10, 10)).into_iter().chain(drag((20, 20), (40, 30))) {
            session.handle(input);
        }
        assert_eq!(session.boxes().len(), 2);

        session.handle(Input::Key(KEY_RESET));
        assert!(session.boxes().is_empty());
        assert_eq!(session.state(), BBoxState::Idle);

        for input in drag((30, 10), (5, 25)) {
            session.handle(input);
        }
        session.handle(Input::Key(KEY_SAVE));
        assert_eq!(session.state(), BBoxState::Saved);
        assert_eq!(
            session.saved_boxes(),
            vec![Rect::from_corners(Point::new(10, 20), Point::new(60, 50))]
        );
    }

    #[test]
    fn test_bbox_save_empty_is_noop() {
        let mut session = BBoxSession::new(Scaler::default());
        session.handle(Input::Key(KEY_SAVE));
        assert_eq!(session.state(), BBoxState::Saved);
        assert!(session.saved_boxes().is_empty());
    }

    #[test]
    fn test_bbox_cancel_discards() {
        let mut session = BBoxSession::new(Scaler::default());
        for input in drag((0, 0), (10, 10)) {
            session.handle(input);
        }
        session.handle(Input::Key(KEY_QUIT));
        assert_eq!(session.state(), BBoxState::Cancelled);
        assert!(session.boxes().is_empty());
        assert!(session.saved_boxes().is_empty());
    }

    #[test]
    fn test_abandon_unfinished_sessions() {
        let mut crop = CropSession::new(Scaler::default());
        for input in drag((0, 0), (10, 10)) {
            crop.handle(input);
        }
        crop.abandon();
        assert_eq!(crop.state(), CropState::Cancelled);

        let mut bbox = BBoxSession::new(Scaler::default());
        bbox.handle(Input::Key(KEY_SAVE));
        bbox.abandon();
        assert_eq!(bbox.state(), BBoxState::Saved);
    }
}
