pub mod jobs_controller;
