use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cgmath::Vector2;
use iced::widget::canvas::{self, Program};
use iced::widget::{button, canvas as canvas_widget, checkbox, column, container, row, text};
use iced::{mouse, Element, Length, Point, Rectangle, Renderer, Size, Subscription, Task, Theme};
use rfd::FileDialog;

use photo_wall::stage::{Brush, Stage, VisualId};
use photo_wall::{
    FolderSource, ImageFileDecoder, SlideShow, SlideshowConfig, SurfaceStore, TransitionKind,
};

/// Frame interval for driving the animation clock (~60fps)
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Main application state
struct PhotoWall {
    /// Runtime hosting the blocking decode workers
    runtime: tokio::runtime::Runtime,
    /// Decoded pixels shared with the decode workers
    store: SurfaceStore,
    /// Per-surface iced handles, built lazily as decodes land
    handles: HashMap<photo_wall::stage::SurfaceId, iced::widget::image::Handle>,
    config: SlideshowConfig,
    slideshow: Option<SlideShow>,
    window_size: Vector2<f32>,
    /// Status message to display to the user
    status: String,
    last_tick: Option<Instant>,
    near_slide_enabled: bool,
    far_slide_enabled: bool,
    zoom_enabled: bool,
    stack_enabled: bool,
    spotlight_enabled: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Open Folder" button
    OpenFolder,
    /// Animation clock tick
    Tick(Instant),
    /// Window was resized
    WindowResized(Size),
    /// User toggled a transition kind
    ToggleTransition(TransitionKind, bool),
    /// User toggled the color spotlight
    ToggleSpotlight(bool),
}

impl PhotoWall {
    fn new() -> (Self, Task<Message>) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to start the decode runtime");

        (
            PhotoWall {
                runtime,
                store: SurfaceStore::new(),
                handles: HashMap::new(),
                config: SlideshowConfig::default(),
                slideshow: None,
                window_size: Vector2::new(1280.0, 800.0),
                status: String::from("Open a folder of photos to start the wall."),
                last_tick: None,
                near_slide_enabled: true,
                far_slide_enabled: true,
                zoom_enabled: true,
                stack_enabled: true,
                spotlight_enabled: true,
            },
            Task::none(),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with Photos")
                    .pick_folder();

                let Some(folder_path) = folder else {
                    return Task::none();
                };

                let source = FolderSource::new(&folder_path);
                if source.is_empty() {
                    self.status = format!(
                        "No photos found in {}. Add some images and try again.",
                        folder_path.display()
                    );
                    return Task::none();
                }

                let decoder = Arc::new(ImageFileDecoder::new(self.store.clone()));
                match SlideShow::new(
                    &self.config,
                    &source,
                    decoder,
                    self.runtime.handle().clone(),
                ) {
                    Ok(mut slideshow) => {
                        slideshow.update_window_size(self.window_size);
                        slideshow.start();
                        self.slideshow = Some(slideshow);
                        self.last_tick = None;
                        self.status = format!("Playing {}", folder_path.display());
                    }
                    Err(error) => {
                        self.status = format!("Could not start the slideshow: {error}");
                    }
                }

                Task::none()
            }
            Message::Tick(now) => {
                let dt = self
                    .last_tick
                    .map(|last| now.duration_since(last))
                    .unwrap_or(TICK_INTERVAL);
                self.last_tick = Some(now);

                if let Some(slideshow) = &mut self.slideshow {
                    slideshow.tick(dt);
                }
                self.refresh_handles();

                Task::none()
            }
            Message::WindowResized(size) => {
                self.window_size = Vector2::new(size.width, size.height);
                if let Some(slideshow) = &mut self.slideshow {
                    slideshow.update_window_size(self.window_size);
                }
                Task::none()
            }
            Message::ToggleTransition(kind, enabled) => {
                match kind {
                    TransitionKind::NearSlide => self.near_slide_enabled = enabled,
                    TransitionKind::FarSlide => self.far_slide_enabled = enabled,
                    TransitionKind::Zoom => self.zoom_enabled = enabled,
                    TransitionKind::Stack => self.stack_enabled = enabled,
                }
                if let Some(slideshow) = &mut self.slideshow {
                    slideshow.set_transition_enabled(kind, enabled);
                }
                Task::none()
            }
            Message::ToggleSpotlight(enabled) => {
                self.spotlight_enabled = enabled;
                if let Some(slideshow) = &mut self.slideshow {
                    slideshow.set_spotlight_enabled(enabled);
                }
                Task::none()
            }
        }
    }

    /// Build iced image handles for any surfaces that arrived since the
    /// last tick.
    fn refresh_handles(&mut self) {
        let Some(slideshow) = &self.slideshow else {
            return;
        };

        for tile in slideshow.layout().tiles() {
            let Some(image) = tile.photo().and_then(|photo| photo.image()) else {
                continue;
            };
            if self.handles.contains_key(&image.surface) {
                continue;
            }
            if let Some(pixels) = self.store.get(image.surface) {
                let handle = iced::widget::image::Handle::from_rgba(
                    pixels.width(),
                    pixels.height(),
                    pixels.as_raw().clone(),
                );
                self.handles.insert(image.surface, handle);
            }
        }
    }

    fn view(&self) -> Element<Message> {
        let controls = column![
            text("Photo Wall").size(28),
            button("Open Folder").on_press(Message::OpenFolder).padding(10),
            checkbox("Near slide", self.near_slide_enabled)
                .on_toggle(|v| Message::ToggleTransition(TransitionKind::NearSlide, v)),
            checkbox("Far slide", self.far_slide_enabled)
                .on_toggle(|v| Message::ToggleTransition(TransitionKind::FarSlide, v)),
            checkbox("Zoom", self.zoom_enabled)
                .on_toggle(|v| Message::ToggleTransition(TransitionKind::Zoom, v)),
            checkbox("Stack", self.stack_enabled)
                .on_toggle(|v| Message::ToggleTransition(TransitionKind::Stack, v)),
            checkbox("Color spotlight", self.spotlight_enabled)
                .on_toggle(Message::ToggleSpotlight),
            text(&self.status).size(14),
        ]
        .spacing(16)
        .padding(20)
        .width(Length::Fixed(220.0));

        let wall: Element<Message> = match &self.slideshow {
            Some(slideshow) => canvas_widget(WallView {
                slideshow,
                handles: &self.handles,
            })
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
            None => container(text("No slideshow running").size(20))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        row![controls, wall].into()
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn subscription(&self) -> Subscription<Message> {
        let resize = iced::window::resize_events().map(|(_id, size)| Message::WindowResized(size));

        if self.slideshow.is_some() {
            Subscription::batch([
                iced::time::every(TICK_INTERVAL).map(Message::Tick),
                resize,
            ])
        } else {
            resize
        }
    }
}

/// Canvas program painting the engine's retained visual tree.
struct WallView<'a> {
    slideshow: &'a SlideShow,
    handles: &'a HashMap<photo_wall::stage::SurfaceId, iced::widget::image::Handle>,
}

impl WallView<'_> {
    fn draw_visual(&self, frame: &mut canvas::Frame, stage: &Stage, id: VisualId) {
        let visual = stage.visual(id);

        frame.push_transform();
        frame.translate(iced::Vector::new(visual.offset.x, visual.offset.y));

        // Scale and rotate about the visual's center point.
        frame.translate(iced::Vector::new(visual.center_point.x, visual.center_point.y));
        frame.rotate(visual.rotation);
        frame.scale_nonuniform(iced::Vector::new(visual.scale.x, visual.scale.y));
        frame.translate(iced::Vector::new(
            -visual.center_point.x,
            -visual.center_point.y,
        ));

        let size = Size::new(visual.size.x, visual.size.y);
        match visual.brush {
            Brush::None => {}
            Brush::Solid(color) => {
                frame.fill_rectangle(
                    Point::ORIGIN,
                    size,
                    iced::Color::from_rgba(color.r, color.g, color.b, color.a * visual.opacity),
                );
            }
            Brush::Surface(surface) => {
                if let Some(handle) = self.handles.get(&surface) {
                    frame.draw_image(
                        Rectangle::new(Point::ORIGIN, size),
                        canvas::Image::new(handle.clone()),
                    );
                }
                // Approximate desaturation with a gray wash; the real
                // compositor would run a saturation effect per surface.
                let wash = 1.0 - visual.saturation.clamp(0.0, 1.0);
                if wash > 0.0 {
                    frame.fill_rectangle(
                        Point::ORIGIN,
                        size,
                        iced::Color::from_rgba(0.5, 0.5, 0.5, 0.8 * wash),
                    );
                }
            }
        }

        for &child in visual.children() {
            self.draw_visual(frame, stage, child);
        }

        frame.pop_transform();
    }
}

impl Program<Message> for WallView<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let stage = self.slideshow.stage();
        self.draw_visual(&mut frame, stage, self.slideshow.root());
        vec![frame.into_geometry()]
    }
}

fn main() -> iced::Result {
    env_logger::init();

    iced::application("Photo Wall", PhotoWall::update, PhotoWall::view)
        .subscription(PhotoWall::subscription)
        .theme(PhotoWall::theme)
        .centered()
        .run_with(PhotoWall::new)
}
