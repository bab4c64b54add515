mod fetcher;
mod pipeline;
