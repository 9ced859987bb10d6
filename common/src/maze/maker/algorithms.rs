pub mod backtrack;
pub mod division;
pub mod kruskal;
pub mod wilson;
