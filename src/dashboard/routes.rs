use super::views::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Status,
    Output(Output),
    Mode,
    Reset,
    Custom,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Index,
        Route::Status,
        Route::Output(Output::One),
        Route::Output(Output::Two),
        Route::Mode,
        Route::Reset,
        Route::Custom,
    ];

    pub const PATHS: [&'static str; 7] = [
        Route::Index.path(),
        Route::Status.path(),
        Route::Output(Output::One).path(),
        Route::Output(Output::Two).path(),
        Route::Mode.path(),
        Route::Reset.path(),
        Route::Custom.path(),
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Route::Index => "/",
            Route::Status => "/api/status",
            Route::Output(Output::One) => "/api/output1",
            Route::Output(Output::Two) => "/api/output2",
            Route::Mode => "/api/mode",
            Route::Reset => "/api/reset",
            Route::Custom => "/api/custom",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}
