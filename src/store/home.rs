//! Home screen state: weather card, care tasks and the plant being viewed.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Store;

/// Weather shown on the home card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherData {
    /// City name
    pub city: String,
    /// Temperature in degrees Celsius
    pub temperature: i32,
    /// Short condition, e.g. "Mostly clear"
    pub description: String,
    /// Wind speed as displayed
    pub wind: String,
    /// Humidity as displayed
    pub humidity: String,
    /// Chance of rain as displayed
    pub rain: String,
}

impl Default for WeatherData {
    fn default() -> Self {
        Self {
            city: "Surat".to_string(),
            temperature: 24,
            description: "Mostly clear".to_string(),
            wind: "10 m/s".to_string(),
            humidity: "98%".to_string(),
            rain: "100%".to_string(),
        }
    }
}

/// A plant care task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: String,
    /// Plant the task is about
    pub title: String,
    /// What to do
    pub description: String,
    /// Whether the task was done
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
        }
    }
}

/// How to look after a plant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareInstructions {
    /// Watering advice
    pub watering: String,
    /// Light advice
    pub sunlight: String,
    /// Temperature advice
    pub temperature: String,
}

/// A plant from the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantDetails {
    /// Plant identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Image URL
    pub image: String,
    /// Price in rupees
    pub price: u32,
    /// Description
    pub description: String,
    /// Care advice
    pub care_instructions: CareInstructions,
    /// Selling points
    pub features: Vec<String>,
}

/// Complete home screen state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeState {
    /// Current weather
    pub weather: WeatherData,
    /// Tasks due today
    pub today_tasks: Vec<Task>,
    /// Tasks coming up
    pub upcoming_tasks: Vec<Task>,
    /// Plant whose details are open
    pub selected_plant: Option<PlantDetails>,
}

impl Default for HomeState {
    fn default() -> Self {
        Self {
            weather: WeatherData::default(),
            today_tasks: Vec::new(),
            upcoming_tasks: vec![
                Task::new("1", "Cacti", "Turn on grow light for 4 hours"),
                Task::new("2", "Tail boi", "300 - 350 ML Water Need"),
                Task::new("3", "Golden Green", "Change water of the flower pot"),
                Task::new("4", "Golden Green", "Make 8° higher temperatures in room"),
            ],
            selected_plant: None,
        }
    }
}

/// Store of the [`HomeState`].
#[derive(Default)]
pub struct HomeStore {
    store: Store<HomeState>,
}

impl HomeStore {
    /// Current state.
    pub fn state(&self) -> HomeState {
        self.store.get()
    }

    /// Observe changes.
    pub fn subscribe(&self) -> watch::Receiver<HomeState> {
        self.store.subscribe()
    }

    /// Replace the weather card.
    pub fn set_weather(&self, weather: WeatherData) {
        self.store.update(|state| state.weather = weather);
    }

    /// Replace today's tasks.
    pub fn set_today_tasks(&self, tasks: Vec<Task>) {
        self.store.update(|state| state.today_tasks = tasks);
    }

    /// Replace the upcoming tasks.
    pub fn set_upcoming_tasks(&self, tasks: Vec<Task>) {
        self.store.update(|state| state.upcoming_tasks = tasks);
    }

    /// Open a plant's details, or close them with `None`.
    pub fn set_selected_plant(&self, plant: Option<PlantDetails>) {
        self.store.update(|state| state.selected_plant = plant);
    }
}
