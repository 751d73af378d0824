mod events;
mod hub;
mod rooms;
mod rounds;
mod scoring;
