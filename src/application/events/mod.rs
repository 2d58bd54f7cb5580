mod live_channel;

pub use live_channel::{
    create_live_channel, LiveChannel, RouteSubscription, SharedLiveChannel, SseFrame,
};
