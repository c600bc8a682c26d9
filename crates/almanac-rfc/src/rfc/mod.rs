pub mod caldav;
pub mod ical;
