mod analyzer;
mod chat;
mod config;
mod gemini;
mod markdown;

use iced::{
    alignment, clipboard,
    event::{self, Event as IcedEvent},
    font,
    keyboard::{self, Key},
    time,
    widget::{
        button, column, container, image as image_widget, rich_text, row, scrollable, span, text,
        text_input, Space,
    },
    window, Element, Font, Length, Subscription, Task, Theme,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const BOLD: Font = Font {
    weight: font::Weight::Bold,
    ..Font::DEFAULT
};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const ANALYZE_MESSAGES: [&str; 4] = [
    "Examining leaves and stems...",
    "Consulting the field guide...",
    "Comparing petals and bark...",
    "Writing up care instructions...",
];

fn render_markdown(content: &str) -> Element<'static, Message> {
    let mut blocks = column![].spacing(6);

    for block in markdown::parse(content) {
        let element: Element<'static, Message> = match block {
            markdown::Block::Heading { level, text: heading } => {
                let size = match level {
                    1 => 24,
                    2 => 20,
                    _ => 17,
                };
                text(heading).size(size).font(BOLD).into()
            }
            markdown::Block::ListItem(spans) => {
                row![text("• ").size(15), inline_text(&spans)].into()
            }
            markdown::Block::Paragraph(spans) => inline_text(&spans),
            markdown::Block::Spacer => Space::with_height(8).into(),
        };
        blocks = blocks.push(element);
    }

    blocks.into()
}

fn inline_text(spans: &[markdown::Span]) -> Element<'static, Message> {
    let rich_spans: Vec<text::Span<'static, Message>> = spans
        .iter()
        .map(|s| match s {
            markdown::Span::Plain(content) => span(content.clone()),
            markdown::Span::Bold(content) => span(content.clone()).font(BOLD),
        })
        .collect();

    rich_text(rich_spans).size(15).into()
}

fn main() -> iced::Result {
    let config = config::Config::load();

    iced::application("Botanica", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: iced::Size::new(config.window.width as f32, config.window.height as f32),
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(App::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Identify,
    Chat,
}

#[derive(Debug, Clone)]
enum Message {
    ModeSelected(Mode),
    PathInputChanged(String),
    LoadImage,
    PickImage,
    ImagePicked(Option<PathBuf>),
    FileDropped(PathBuf),
    ImageLoaded(Result<analyzer::SelectedImage, String>),
    Analyze,
    AnalysisFinished(Result<String, String>),
    ClearImage,
    CopyResult,
    ChatInputChanged(String),
    SendChat,
    ChatResponded(Result<String, String>),
    Tick,
    Exit,
}

struct App {
    mode: Mode,
    path_input: String,
    analyzer: analyzer::Analyzer,
    chat_input: String,
    transcript: chat::Transcript,
    session: Arc<Mutex<gemini::ChatSession>>,
    client: gemini::GeminiClient,
    loading_frame: usize,
    input_id: text_input::Id,
    chat_scroll: scrollable::Id,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let config = config::Config::load();

        let client = gemini::GeminiClient::with_config(
            config.gemini.resolved_api_key(),
            config.gemini.model.clone(),
        );
        let session = gemini::ChatSession::new(client.clone());

        let input_id = text_input::Id::unique();

        let app = App {
            mode: Mode::Identify,
            path_input: String::new(),
            analyzer: analyzer::Analyzer::new(),
            chat_input: String::new(),
            transcript: chat::Transcript::new(),
            session: Arc::new(Mutex::new(session)),
            client,
            loading_frame: 0,
            input_id: input_id.clone(),
            chat_scroll: scrollable::Id::unique(),
        };

        (app, text_input::focus(input_id))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ModeSelected(mode) => {
                self.mode = mode;
                match mode {
                    Mode::Chat => text_input::focus(self.input_id.clone()),
                    Mode::Identify => Task::none(),
                }
            }
            Message::PathInputChanged(value) => {
                self.path_input = value;
                Task::none()
            }
            Message::LoadImage => {
                let path = self.path_input.trim();
                if path.is_empty() || self.analyzer.is_analyzing {
                    return Task::none();
                }
                load_image_task(PathBuf::from(path))
            }
            Message::PickImage => {
                if self.analyzer.is_analyzing {
                    return Task::none();
                }
                Task::future(async {
                    let path = rfd::FileDialog::new()
                        .add_filter("Images", &["jpg", "jpeg", "png", "webp"])
                        .pick_file();
                    Message::ImagePicked(path)
                })
            }
            Message::ImagePicked(Some(path)) | Message::FileDropped(path) => {
                if self.analyzer.is_analyzing {
                    return Task::none();
                }
                self.mode = Mode::Identify;
                load_image_task(path)
            }
            Message::ImagePicked(None) => Task::none(),
            Message::ImageLoaded(Ok(image)) => {
                self.analyzer.set_image(image);
                self.path_input.clear();
                Task::none()
            }
            Message::ImageLoaded(Err(message)) => {
                self.analyzer.set_error(message);
                Task::none()
            }
            Message::Analyze => match self.analyzer.begin_analysis() {
                Some((mime_type, payload)) => {
                    let client = self.client.clone();
                    Task::future(async move {
                        let result = client
                            .generate_with_image(&mime_type, &payload, gemini::IDENTIFY_PROMPT)
                            .await;
                        Message::AnalysisFinished(result.map_err(|e| e.to_string()))
                    })
                }
                None => Task::none(),
            },
            Message::AnalysisFinished(outcome) => {
                if let Err(e) = &outcome {
                    eprintln!("Error identifying plant: {}", e);
                }
                self.analyzer.finish_analysis(outcome);
                Task::none()
            }
            Message::ClearImage => {
                self.analyzer.clear();
                Task::none()
            }
            Message::CopyResult => match &self.analyzer.result {
                Some(result) => clipboard::write(result.clone()),
                None => Task::none(),
            },
            Message::ChatInputChanged(value) => {
                self.chat_input = value;
                Task::none()
            }
            Message::SendChat => match self.transcript.begin_send(&self.chat_input) {
                Some(text) => {
                    self.chat_input.clear();
                    let session = self.session.clone();
                    let send = Task::future(async move {
                        let mut session = session.lock().await;
                        let result = session.send(&text).await;
                        Message::ChatResponded(result.map_err(|e| e.to_string()))
                    });
                    Task::batch([send, self.snap_chat_to_bottom()])
                }
                None => Task::none(),
            },
            Message::ChatResponded(outcome) => {
                if let Err(e) = &outcome {
                    eprintln!("Error sending message: {}", e);
                }
                self.transcript.finish_send(outcome);
                Task::batch([
                    self.snap_chat_to_bottom(),
                    text_input::focus(self.input_id.clone()),
                ])
            }
            Message::Tick => {
                if self.analyzer.is_analyzing || self.transcript.is_sending {
                    self.loading_frame =
                        (self.loading_frame + 1) % (ANALYZE_MESSAGES.len() * 10);
                }
                Task::none()
            }
            Message::Exit => iced::exit(),
        }
    }

    fn snap_chat_to_bottom(&self) -> Task<Message> {
        scrollable::snap_to(self.chat_scroll.clone(), scrollable::RelativeOffset::END)
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.analyzer.is_analyzing || self.transcript.is_sending {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| match event {
            IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) => Some(Message::Exit),
            IcedEvent::Window(window::Event::FileDropped(path)) => {
                Some(Message::FileDropped(path))
            }
            _ => None,
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let nav = row![
            self.mode_button("Identify", Mode::Identify),
            self.mode_button("Assistant", Mode::Chat),
        ]
        .spacing(5);

        let body: Element<Message> = match self.mode {
            Mode::Identify => self.identify_view(),
            Mode::Chat => self.chat_view(),
        };

        container(column![nav, body].spacing(10).padding(10))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn mode_button(&self, label: &'static str, mode: Mode) -> Element<'static, Message> {
        button(text(label).size(14))
            .on_press(Message::ModeSelected(mode))
            .style(if self.mode == mode {
                button::primary
            } else {
                button::secondary
            })
            .padding(10)
            .into()
    }

    fn identify_view(&self) -> Element<Message> {
        if self.analyzer.is_analyzing {
            let message_idx = (self.loading_frame / 10) % ANALYZE_MESSAGES.len();
            let spinner_idx = self.loading_frame % SPINNER_FRAMES.len();

            return container(
                column![
                    text(SPINNER_FRAMES[spinner_idx]).size(32),
                    text(ANALYZE_MESSAGES[message_idx]).size(15)
                ]
                .spacing(10)
                .align_x(alignment::Horizontal::Center),
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .into();
        }

        let mut col = column![].spacing(10);

        match &self.analyzer.image {
            None => {
                col = col.push(
                    text("Upload a photo of a plant to get identification details and care tips.")
                        .size(15),
                );
                col = col.push(
                    row![
                        text_input("Path to a photo...", &self.path_input)
                            .on_input(Message::PathInputChanged)
                            .on_submit(Message::LoadImage)
                            .padding(10)
                            .size(15),
                        button(text("Browse...").size(14))
                            .on_press(Message::PickImage)
                            .padding(10),
                    ]
                    .spacing(5),
                );
                col = col.push(
                    text("JPG, PNG, WEBP (max 5MB). You can also drop a photo onto the window.")
                        .size(13),
                );
            }
            Some(image) => {
                let handle = image_widget::Handle::from_bytes(image.bytes.clone());
                col = col.push(
                    container(image_widget(handle).height(300))
                        .width(Length::Fill)
                        .align_x(alignment::Horizontal::Center),
                );

                if self.analyzer.result.is_none() {
                    col = col.push(
                        row![
                            button(text("Analyze Photo").size(14))
                                .on_press(Message::Analyze)
                                .padding(10),
                            button(text("Remove").size(14))
                                .on_press(Message::ClearImage)
                                .style(button::secondary)
                                .padding(10),
                        ]
                        .spacing(5),
                    );
                }
            }
        }

        if let Some(error) = &self.analyzer.error {
            col = col.push(text(error.as_str()).size(15).style(|theme: &Theme| {
                text::Style {
                    color: Some(theme.palette().danger),
                }
            }));
        }

        if let Some(result) = &self.analyzer.result {
            col = col.push(
                scrollable(container(render_markdown(result)).padding(15).width(Length::Fill))
                    .height(Length::Fill),
            );
            col = col.push(
                row![
                    button(text("Analyze another plant").size(14))
                        .on_press(Message::ClearImage)
                        .style(button::secondary)
                        .padding(10),
                    container(
                        button(text("[Copy]").size(14))
                            .on_press(Message::CopyResult)
                            .padding(10)
                    )
                    .width(Length::Fill)
                    .align_x(alignment::Horizontal::Right),
                ]
                .spacing(5),
            );
        }

        col.into()
    }

    fn chat_view(&self) -> Element<Message> {
        let mut feed = column![].spacing(12).padding(10);

        for message in self.transcript.messages() {
            feed = feed.push(message_view(message));
        }

        if self.transcript.is_sending {
            let spinner_idx = self.loading_frame % SPINNER_FRAMES.len();
            feed = feed.push(
                row![
                    text(SPINNER_FRAMES[spinner_idx]).size(15),
                    text("Sprout is thinking...").size(14)
                ]
                .spacing(8),
            );
        }

        let can_send = !self.transcript.is_sending && !self.chat_input.trim().is_empty();

        let input_row = row![
            text_input("Ask about soil, watering, or pests...", &self.chat_input)
                .on_input(Message::ChatInputChanged)
                .on_submit(Message::SendChat)
                .padding(12)
                .size(15)
                .id(self.input_id.clone()),
            button(text("Send").size(14))
                .on_press_maybe(can_send.then_some(Message::SendChat))
                .padding(12),
        ]
        .spacing(5);

        column![
            scrollable(feed)
                .id(self.chat_scroll.clone())
                .height(Length::Fill),
            input_row,
            container(text("AI can make mistakes. Double-check critical gardening info.").size(12))
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Center),
        ]
        .spacing(10)
        .into()
    }

    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn message_view(message: &chat::ChatMessage) -> Element<'_, Message> {
    match message.role {
        chat::Role::User => container(
            container(text(message.text.as_str()).size(15))
                .padding(10)
                .style(container::rounded_box),
        )
        .width(Length::Fill)
        .align_x(alignment::Horizontal::Right)
        .into(),
        chat::Role::Model => container(render_markdown(&message.text))
            .width(Length::Fill)
            .into(),
    }
}

fn load_image_task(path: PathBuf) -> Task<Message> {
    Task::future(async move {
        match analyzer::load_image(&path).await {
            Ok(image) => Message::ImageLoaded(Ok(image)),
            Err(e) => Message::ImageLoaded(Err(e.to_string())),
        }
    })
}
