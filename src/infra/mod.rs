pub mod aquarius;
