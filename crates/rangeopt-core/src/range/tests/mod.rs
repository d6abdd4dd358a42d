mod combine;
mod tree;
